use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::error::Error;
use crate::schema::RecordKey;
use crate::vectorstores::{MemoryVectorStore, SimilarityMetric};
use crate::Result;

/// Result count used when a search does not pass one
pub const DEFAULT_TOP_K: usize = 10;

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Engine configuration, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed store dimension; unset means "set by the first insert"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
    /// Default similarity metric
    pub metric: SimilarityMetric,
    /// Result count for [`Retriever::search_default`](crate::retriever::Retriever::search_default)
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    /// Default score floor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: None,
            metric: SimilarityMetric::Cosine,
            default_top_k: default_top_k(),
            min_score: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&content)
    }

    /// Check the configuration for values no store or query can use
    pub fn validate(&self) -> Result<()> {
        if self.dimension == Some(0) {
            return Err(Error::InvalidArgument(
                "dimension must be at least 1".to_string(),
            ));
        }
        if self.default_top_k == 0 {
            return Err(Error::InvalidArgument(
                "default_top_k must be at least 1".to_string(),
            ));
        }
        if let Some(min_score) = self.min_score {
            if min_score.is_nan() {
                return Err(Error::InvalidArgument("min_score must not be NaN".to_string()));
            }
        }
        Ok(())
    }

    /// Set the fixed dimension
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// Set the similarity metric
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the default result count
    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Set the default score floor
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Build an empty store honoring the configured dimension
    pub fn build_store<K: RecordKey>(&self) -> Result<MemoryVectorStore<K>> {
        self.validate()?;
        match self.dimension {
            Some(dimension) => MemoryVectorStore::with_dimension(dimension),
            None => Ok(MemoryVectorStore::new()),
        }
    }
}
