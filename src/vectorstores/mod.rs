pub mod memory;
mod similarity;

pub use memory::{MemoryVectorStore, Snapshot, SnapshotIter};
pub use similarity::{
    cosine_similarity, dot_product, euclidean_distance, norm, Cosine, DotProduct,
    NegativeEuclidean, SimilarityFunction, SimilarityMetric,
};
