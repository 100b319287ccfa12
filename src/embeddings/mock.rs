use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;
use crate::traits::{EmbeddingModel, Runnable};
use crate::Result;

/// A deterministic embeddings model for tests and demos
pub struct MockEmbeddings {
    dimension: usize,
    embeddings: HashMap<String, Vec<f64>>,
    calls: AtomicUsize,
}

impl Default for MockEmbeddings {
    fn default() -> Self {
        Self::new(4)
    }
}

impl MockEmbeddings {
    /// Create a new mock embeddings model
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            embeddings: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a pre-defined embedding for a text
    pub fn with_embedding(mut self, text: impl Into<String>, embedding: Vec<f64>) -> Result<Self> {
        if embedding.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, embedding.len()));
        }
        self.embeddings.insert(text.into(), embedding);
        Ok(self)
    }

    /// Number of texts embedded so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generate a deterministic embedding from text
    fn generate_embedding(&self, text: &str) -> Vec<f64> {
        let mut result = vec![0.0; self.dimension];

        // Fold character codes into buckets
        for (i, c) in text.chars().enumerate() {
            let pos = i % self.dimension;
            result[pos] += (c as u32 % 100) as f64 / 100.0;
        }

        let magnitude: f64 = result.iter().map(|x| x * x).sum::<f64>().sqrt();
        if magnitude > 0.0 {
            for val in &mut result {
                *val /= magnitude;
            }
        }

        result
    }
}

#[async_trait]
impl Runnable<String, Vec<f64>> for MockEmbeddings {
    async fn invoke(&self, input: String) -> Result<Vec<f64>> {
        if self.dimension == 0 {
            return Err(Error::Embedding(
                "mock embeddings configured with zero dimension".to_string(),
            ));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(embedding) = self.embeddings.get(&input) {
            return Ok(embedding.clone());
        }

        Ok(self.generate_embedding(&input))
    }
}

impl EmbeddingModel for MockEmbeddings {
    fn model_name(&self) -> &str {
        "mock-embeddings"
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Document;

    #[tokio::test]
    async fn test_generated_embeddings_are_deterministic_and_normalized() {
        let model = MockEmbeddings::new(8);
        let a = model.invoke("vector search".to_string()).await.unwrap();
        let b = model.invoke("vector search".to_string()).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        let magnitude: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-9);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_predefined_embedding_wins() {
        let model = MockEmbeddings::new(3)
            .with_embedding("cat", vec![1.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(
            model.invoke("cat".to_string()).await.unwrap(),
            vec![1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_predefined_embedding_dimension_is_checked() {
        let result = MockEmbeddings::new(3).with_embedding("cat", vec![1.0, 0.0]);
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_embed_documents_preserves_order() {
        let model = MockEmbeddings::new(2)
            .with_embedding("first", vec![1.0, 0.0])
            .unwrap()
            .with_embedding("second", vec![0.0, 1.0])
            .unwrap();

        let embeddings = model
            .embed_documents(vec![Document::new("first"), Document::new("second")])
            .await
            .unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_zero_dimension_fails() {
        let model = MockEmbeddings::new(0);
        let result = tokio_test::block_on(model.invoke("anything".to_string()));
        assert!(matches!(result, Err(Error::Embedding(_))));
    }
}
