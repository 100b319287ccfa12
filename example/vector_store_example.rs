//! Example: Semantic search over a handful of documents
//! Run with: RUST_LOG=debug cargo run --bin vector_store

use glint_retrieval::embeddings::MockEmbeddings;
use glint_retrieval::index::SemanticIndex;
use glint_retrieval::retriever::{Query, Retriever};
use glint_retrieval::schema::Document;
use glint_retrieval::traits::VectorStore;
use glint_retrieval::vectorstores::{DotProduct, SimilarityMetric};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Create a mock embeddings model
    let embeddings = MockEmbeddings::new(64);

    // Create an index that embeds documents with it
    let mut index =
        SemanticIndex::new(embeddings).with_similarity_metric(SimilarityMetric::Cosine);

    let docs = vec![
        Document::new("Rust is a systems programming language").with_id("rust"),
        Document::new("Python is a high-level programming language").with_id("python"),
        Document::new("JavaScript is a scripting language").with_id("javascript"),
    ];
    index.add_documents(docs).await?;

    // Search for similar documents
    let results = index.search("programming language", 2).await?;

    println!("Search results:");
    for (doc, score) in &results {
        println!("Score: {:.4}, Content: {}", score, doc.page_content);
    }

    // The same store can be queried directly with any similarity function
    let retriever = Retriever::new(index.store().clone());
    let rust = index.store().require(&"rust".to_string())?;
    let matches = retriever.query(&Query::new(rust.vector, 3).with_min_score(0.0), &DotProduct)?;

    println!("Neighbors of \"rust\" by dot product:");
    for result in matches {
        println!("Score: {:.4}, Id: {}", result.score, result.id);
    }

    Ok(())
}
