use async_trait::async_trait;
use futures::future::try_join_all;

use crate::schema::Document;
use crate::Result;

/// Trait for any component that can be invoked with an input and produces an output asynchronously.
///
/// Embedding providers are the main implementors; the retrieval engine itself never
/// invokes one, it only consumes the vectors they produce.
#[async_trait]
pub trait Runnable<Input: Send + 'static, Output: 'static> {
    /// Run the component on the given input and return the output.
    async fn invoke(&self, input: Input) -> Result<Output>;
}

/// Trait for embedding models (text to vector).
#[async_trait]
pub trait EmbeddingModel: Runnable<String, Vec<f64>> + Send + Sync {
    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
    /// Get the dimension of the embeddings produced by this model.
    fn embedding_dimension(&self) -> usize;
    /// Embed multiple texts, failing if any single text fails.
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>> {
        try_join_all(texts.into_iter().map(|text| self.invoke(text))).await
    }
    /// Embed documents (using their page_content).
    async fn embed_documents(&self, documents: Vec<Document>) -> Result<Vec<Vec<f64>>> {
        let texts: Vec<String> = documents.into_iter().map(|doc| doc.page_content).collect();
        self.embed_batch(texts).await
    }
}

/// Trait for document-level vector stores that embed on the way in.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add documents to the vector store, returning their ids.
    async fn add_documents(&mut self, documents: Vec<Document>) -> Result<Vec<String>>;
    /// Search for similar documents using a query string.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<(Document, f64)>>;
    /// Search using a vector directly.
    async fn search_by_vector(
        &self,
        embedding: &[f64],
        limit: usize,
    ) -> Result<Vec<(Document, f64)>>;
    /// Delete documents by ID.
    async fn delete(&mut self, ids: &[String]) -> Result<()>;
}
