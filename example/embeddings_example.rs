//! Example: Embedding texts and comparing them
//! Run with: cargo run --bin embeddings

use glint_retrieval::embeddings::MockEmbeddings;
use glint_retrieval::traits::EmbeddingModel;
use glint_retrieval::vectorstores::{SimilarityFunction, SimilarityMetric};
use glint_retrieval::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Create a mock embeddings model with 384 dimensions
    let embeddings = MockEmbeddings::new(384);

    let texts = vec![
        "This is a test document".to_string(),
        "This is another test document".to_string(),
    ];
    let vectors = embeddings.embed_batch(texts).await?;

    for metric in [
        SimilarityMetric::Cosine,
        SimilarityMetric::DotProduct,
        SimilarityMetric::Euclidean,
    ] {
        let score = metric.score(&vectors[0], &vectors[1])?;
        println!("{}: {:.4}", metric.name(), score);
    }

    Ok(())
}
