//! Brute-force top-K retrieval over a [`MemoryVectorStore`].
//!
//! Every stored vector is scored against the query; results are ranked by
//! score descending, with bit-identical scores ordered by id ascending so
//! that output is reproducible across runs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use tracing::debug;

use crate::config::{EngineConfig, DEFAULT_TOP_K};
use crate::error::Error;
use crate::schema::{Record, RecordKey, SearchResult};
use crate::vectorstores::memory::validate_finite;
use crate::vectorstores::{MemoryVectorStore, SimilarityFunction, SimilarityMetric};
use crate::Result;

/// A similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Query vector, same dimensionality as the store
    pub vector: Vec<f64>,
    /// Maximum number of results, at least 1
    pub top_k: usize,
    /// Results scoring strictly below this are dropped
    pub min_score: f64,
}

fn no_floor() -> f64 {
    f64::NEG_INFINITY
}

impl Query {
    /// Create a query with no score floor
    pub fn new(vector: Vec<f64>, top_k: usize) -> Self {
        Self {
            vector,
            top_k,
            min_score: no_floor(),
        }
    }

    /// Set the minimum score
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    fn validate(&self, dimension: Option<usize>) -> Result<()> {
        if let Some(expected) = dimension {
            if self.vector.len() != expected {
                return Err(Error::dimension_mismatch(expected, self.vector.len()));
            }
        }
        if self.top_k < 1 {
            return Err(Error::InvalidArgument(format!(
                "top_k must be at least 1, got {}",
                self.top_k
            )));
        }
        if self.min_score.is_nan() {
            return Err(Error::InvalidArgument("min_score must not be NaN".to_string()));
        }
        validate_finite(&self.vector)
    }
}

/// A scored record awaiting selection.
///
/// Ordered so that `Less` ranks ahead: higher score first, then lower id.
struct Candidate<'a, K: RecordKey> {
    score: f64,
    record: &'a Record<K>,
}

impl<K: RecordKey> PartialEq for Candidate<'_, K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: RecordKey> Eq for Candidate<'_, K> {}

impl<K: RecordKey> PartialOrd for Candidate<'_, K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: RecordKey> Ord for Candidate<'_, K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // total_cmp is Equal only for bit-identical scores
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.record.id.cmp(&other.record.id))
    }
}

/// Executes similarity queries against a vector store.
///
/// Holds no mutable state; queries never modify the store.
#[derive(Debug, Clone)]
pub struct Retriever<K: RecordKey = String> {
    store: Arc<MemoryVectorStore<K>>,
    similarity_metric: SimilarityMetric,
    min_score: Option<f64>,
    default_top_k: usize,
}

impl<K: RecordKey> Retriever<K> {
    /// Create a retriever using cosine similarity
    pub fn new(store: Arc<MemoryVectorStore<K>>) -> Self {
        Self {
            store,
            similarity_metric: SimilarityMetric::Cosine,
            min_score: None,
            default_top_k: DEFAULT_TOP_K,
        }
    }

    /// Create a retriever with the metric, score floor and result count from `config`
    pub fn from_config(store: Arc<MemoryVectorStore<K>>, config: &EngineConfig) -> Self {
        Self {
            store,
            similarity_metric: config.metric,
            min_score: config.min_score,
            default_top_k: config.default_top_k,
        }
    }

    /// Set the default similarity metric
    pub fn with_similarity_metric(mut self, metric: SimilarityMetric) -> Self {
        self.similarity_metric = metric;
        self
    }

    /// Set the default score floor used by [`Retriever::search`]
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Set the result count used by [`Retriever::search_default`]
    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// The store being queried
    pub fn store(&self) -> &Arc<MemoryVectorStore<K>> {
        &self.store
    }

    /// The default similarity metric
    pub fn similarity_metric(&self) -> SimilarityMetric {
        self.similarity_metric
    }

    /// Search with the default metric and score floor
    pub fn search(&self, vector: &[f64], top_k: usize) -> Result<Vec<SearchResult<K>>> {
        let mut query = Query::new(vector.to_vec(), top_k);
        if let Some(min_score) = self.min_score {
            query = query.with_min_score(min_score);
        }
        self.query(&query, &self.similarity_metric)
    }

    /// Search with the default metric, score floor and result count
    pub fn search_default(&self, vector: &[f64]) -> Result<Vec<SearchResult<K>>> {
        self.search(vector, self.default_top_k)
    }

    /// Result count used by [`Retriever::search_default`]
    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Run `query` scoring with `similarity`.
    ///
    /// Fails with [`Error::DimensionMismatch`] when the query length differs
    /// from the store's dimension, then with [`Error::InvalidArgument`] for
    /// `top_k < 1` (or a NaN floor, or non-finite query components). Both are
    /// checked before any scoring. Returns at most `top_k` results, fewer if fewer
    /// records reach `min_score`.
    pub fn query(
        &self,
        query: &Query,
        similarity: &dyn SimilarityFunction,
    ) -> Result<Vec<SearchResult<K>>> {
        let snapshot = self.store.all()?;
        query.validate(snapshot.dimension())?;

        if snapshot.is_empty() {
            return Ok(Vec::new());
        }

        let mut heap: BinaryHeap<Candidate<'_, K>> = BinaryHeap::with_capacity(query.top_k + 1);
        for record in &snapshot {
            let score = similarity.score_unchecked(&query.vector, &record.vector);
            if score.is_nan() || score < query.min_score {
                continue;
            }

            let candidate = Candidate { score, record };
            if heap.len() < query.top_k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        let results: Vec<SearchResult<K>> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|candidate| SearchResult {
                id: candidate.record.id.clone(),
                score: candidate.score,
                metadata: candidate.record.metadata.clone(),
            })
            .collect();

        debug!(
            metric = similarity.name(),
            top_k = query.top_k,
            scanned = snapshot.len(),
            returned = results.len(),
            "Query completed"
        );
        Ok(results)
    }
}
