//! Document-level semantic search on top of the vector store.
//!
//! The embedding model is injected by the caller; the index embeds documents
//! on the way in and query text on the way out, and delegates ranking to a
//! [`Retriever`].

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::retriever::Retriever;
use crate::schema::{Document, Metadata, Record, SearchResult};
use crate::traits::{EmbeddingModel, Runnable, VectorStore};
use crate::vectorstores::{MemoryVectorStore, SimilarityMetric};
use crate::Result;

/// Metadata key holding a document's text inside its stored record.
///
/// Reserved: documents that already carry it are rejected.
pub const CONTENT_KEY: &str = "_page_content";

/// Metadata key holding a document's id
const ID_KEY: &str = "id";

/// A searchable collection of embedded documents
pub struct SemanticIndex<E: EmbeddingModel> {
    embedding_model: Arc<E>,
    retriever: Retriever<String>,
}

impl<E: EmbeddingModel> SemanticIndex<E> {
    /// Create an index over a new, empty store using cosine similarity
    pub fn new(embedding_model: E) -> Self {
        Self {
            embedding_model: Arc::new(embedding_model),
            retriever: Retriever::new(Arc::new(MemoryVectorStore::new())),
        }
    }

    /// Create an index configured by `config`
    pub fn from_config(embedding_model: E, config: &EngineConfig) -> Result<Self> {
        let store = Arc::new(config.build_store()?);
        Ok(Self {
            embedding_model: Arc::new(embedding_model),
            retriever: Retriever::from_config(store, config),
        })
    }

    /// Set the similarity metric
    pub fn with_similarity_metric(mut self, metric: SimilarityMetric) -> Self {
        self.retriever = self.retriever.with_similarity_metric(metric);
        self
    }

    /// The underlying record store
    pub fn store(&self) -> &Arc<MemoryVectorStore<String>> {
        self.retriever.store()
    }

    /// The injected embedding model
    pub fn embedding_model(&self) -> &E {
        &self.embedding_model
    }

    fn to_document(result: SearchResult<String>) -> (Document, f64) {
        let mut metadata = result.metadata;
        let page_content = match metadata.remove(CONTENT_KEY) {
            Some(serde_json::Value::String(text)) => text,
            _ => String::new(),
        };
        (Document::with_metadata(page_content, metadata), result.score)
    }
}

/// Reject metadata the index would otherwise overwrite.
fn check_reserved_metadata(position: usize, metadata: &Metadata) -> Result<()> {
    if metadata.contains_key(CONTENT_KEY) {
        return Err(Error::InvalidArgument(format!(
            "document {} uses reserved metadata key {:?}",
            position, CONTENT_KEY
        )));
    }
    match metadata.get(ID_KEY) {
        Some(value) if !value.is_string() => Err(Error::InvalidArgument(format!(
            "document {} has a non-string {:?}: {}",
            position, ID_KEY, value
        ))),
        _ => Ok(()),
    }
}

#[async_trait]
impl<E: EmbeddingModel + 'static> VectorStore for SemanticIndex<E> {
    async fn add_documents(&mut self, documents: Vec<Document>) -> Result<Vec<String>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        for (position, doc) in documents.iter().enumerate() {
            check_reserved_metadata(position, &doc.metadata)?;
        }

        // Generate embeddings for the whole batch before touching the store
        let embeddings = self
            .embedding_model
            .embed_documents(documents.clone())
            .await?;
        if embeddings.len() != documents.len() {
            return Err(Error::Embedding(format!(
                "model {} returned {} embeddings for {} documents",
                self.embedding_model.model_name(),
                embeddings.len(),
                documents.len()
            )));
        }

        let mut ids = Vec::with_capacity(documents.len());
        let mut records = Vec::with_capacity(documents.len());
        for (doc, embedding) in documents.into_iter().zip(embeddings) {
            let id = doc
                .id()
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            let mut metadata: Metadata = doc.metadata;
            metadata.insert(ID_KEY.to_string(), serde_json::Value::String(id.clone()));
            metadata.insert(
                CONTENT_KEY.to_string(),
                serde_json::Value::String(doc.page_content),
            );

            records.push(Record {
                id: id.clone(),
                vector: embedding,
                metadata,
            });
            ids.push(id);
        }

        self.store().insert_batch(records)?;
        debug!(
            count = ids.len(),
            model = self.embedding_model.model_name(),
            "Indexed documents"
        );
        Ok(ids)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<(Document, f64)>> {
        let query_embedding = self.embedding_model.invoke(query.to_string()).await?;
        self.search_by_vector(&query_embedding, limit).await
    }

    async fn search_by_vector(
        &self,
        embedding: &[f64],
        limit: usize,
    ) -> Result<Vec<(Document, f64)>> {
        let results = self.retriever.search(embedding, limit)?;
        Ok(results.into_iter().map(Self::to_document).collect())
    }

    async fn delete(&mut self, ids: &[String]) -> Result<()> {
        let mut removed = 0;
        for id in ids {
            if self.store().delete(id)? {
                removed += 1;
            }
        }
        debug!(requested = ids.len(), removed, "Deleted documents");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddings;
    use serde_json::json;

    fn model() -> MockEmbeddings {
        MockEmbeddings::new(3)
            .with_embedding("rust", vec![1.0, 0.0, 0.0])
            .unwrap()
            .with_embedding("systems programming", vec![0.9, 0.1, 0.0])
            .unwrap()
            .with_embedding("gardening", vec![0.0, 0.0, 1.0])
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_and_search_documents() {
        let mut index = SemanticIndex::new(model());
        let ids = index
            .add_documents(vec![
                Document::new("rust").with_id("doc-rust"),
                Document::new("gardening").with_id("doc-garden"),
            ])
            .await
            .unwrap();
        assert_eq!(ids, vec!["doc-rust", "doc-garden"]);
        assert_eq!(index.store().size().unwrap(), 2);

        let results = index.search("systems programming", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        let (doc, score) = &results[0];
        assert_eq!(doc.page_content, "rust");
        assert_eq!(doc.id(), Some("doc-rust"));
        assert!(*score > 0.9);
        assert!(!doc.metadata.contains_key(CONTENT_KEY));
    }

    #[tokio::test]
    async fn test_generated_ids_and_metadata_survive() {
        let mut index = SemanticIndex::new(model());
        let mut metadata = Metadata::new();
        metadata.insert("chapter".to_string(), json!("embeddings"));

        let ids = index
            .add_documents(vec![Document::with_metadata("rust", metadata)])
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert!(Uuid::parse_str(&ids[0]).is_ok());

        let results = index.search_by_vector(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].0.metadata["chapter"], json!("embeddings"));
        assert_eq!(results[0].0.id(), Some(ids[0].as_str()));
    }

    #[tokio::test]
    async fn test_search_by_vector_skips_the_model() {
        let mut index = SemanticIndex::new(model());
        index
            .add_documents(vec![Document::new("rust")])
            .await
            .unwrap();
        let calls = index.embedding_model().calls();

        index.search_by_vector(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(index.embedding_model().calls(), calls);
    }

    #[tokio::test]
    async fn test_delete_documents() {
        let mut index = SemanticIndex::new(model());
        index
            .add_documents(vec![
                Document::new("rust").with_id("a"),
                Document::new("gardening").with_id("b"),
            ])
            .await
            .unwrap();

        index
            .delete(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(index.store().size().unwrap(), 1);
        assert!(index.store().contains(&"b".to_string()).unwrap());
    }

    #[tokio::test]
    async fn test_wrong_model_dimension_is_rejected() {
        let config = EngineConfig::default().with_dimension(5);
        let mut index = SemanticIndex::from_config(model(), &config).unwrap();

        let err = index
            .add_documents(vec![Document::new("rust")])
            .await
            .unwrap_err();
        assert!(err.is_dimension_mismatch());
        assert!(index.store().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_user_page_content_metadata_is_kept() {
        let mut index = SemanticIndex::new(model());
        let mut metadata = Metadata::new();
        metadata.insert("page_content".to_string(), json!("user value"));
        index
            .add_documents(vec![Document::with_metadata("rust", metadata)])
            .await
            .unwrap();

        let results = index.search_by_vector(&[1.0, 0.0, 0.0], 1).await.unwrap();
        let doc = &results[0].0;
        assert_eq!(doc.page_content, "rust");
        assert_eq!(doc.metadata["page_content"], json!("user value"));
        assert!(!doc.metadata.contains_key(CONTENT_KEY));
    }

    #[tokio::test]
    async fn test_reserved_metadata_is_rejected() {
        let mut index = SemanticIndex::new(model());

        let mut reserved = Metadata::new();
        reserved.insert(CONTENT_KEY.to_string(), json!("shadow"));
        let err = index
            .add_documents(vec![
                Document::new("rust"),
                Document::with_metadata("gardening", reserved),
            ])
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());

        let mut numeric_id = Metadata::new();
        numeric_id.insert("id".to_string(), json!(42));
        let err = index
            .add_documents(vec![Document::with_metadata("rust", numeric_id)])
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());

        assert!(index.store().is_empty().unwrap());
        assert_eq!(index.embedding_model().calls(), 0);
    }

    #[tokio::test]
    async fn test_euclidean_metric() {
        let mut index =
            SemanticIndex::new(model()).with_similarity_metric(SimilarityMetric::Euclidean);
        index
            .add_documents(vec![Document::new("rust"), Document::new("gardening")])
            .await
            .unwrap();

        let results = index.search("rust", 2).await.unwrap();
        assert_eq!(results[0].0.page_content, "rust");
        assert_eq!(results[0].1, 0.0);
        assert!(results[1].1 < 0.0);
    }
}
