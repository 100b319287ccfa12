//! Similarity-based nearest-neighbor retrieval over vector embeddings.
//!
//! Records of `(id, vector, metadata)` live in a [`MemoryVectorStore`]; a
//! [`Retriever`] scores every record against a query with a
//! [`SimilarityFunction`] and returns the top-K matches, ties broken by id.
//!
//! ```
//! use std::sync::Arc;
//! use glint_retrieval::prelude::*;
//!
//! let store = Arc::new(MemoryVectorStore::new());
//! store.insert("a".to_string(), vec![1.0, 0.0, 0.0], Metadata::new())?;
//! store.insert("b".to_string(), vec![0.0, 1.0, 0.0], Metadata::new())?;
//!
//! let retriever = Retriever::new(store);
//! let results = retriever.query(&Query::new(vec![1.0, 0.0, 0.0], 1), &Cosine)?;
//! assert_eq!(results[0].id, "a");
//! # Ok::<(), glint_retrieval::Error>(())
//! ```
//!
//! [`MemoryVectorStore`]: vectorstores::MemoryVectorStore
//! [`Retriever`]: retriever::Retriever
//! [`SimilarityFunction`]: vectorstores::SimilarityFunction

pub mod config;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod persistence;
pub mod retriever;
pub mod schema;
pub mod traits;
pub mod vectorstores;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Re-exports for common types
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::error::Error;
    pub use crate::index::SemanticIndex;
    pub use crate::persistence::FileSnapshotStore;
    pub use crate::retriever::{Query, Retriever};
    pub use crate::schema::*;
    pub use crate::traits::*;
    pub use crate::vectorstores::{
        Cosine, DotProduct, MemoryVectorStore, NegativeEuclidean, SimilarityFunction,
        SimilarityMetric, Snapshot,
    };
    pub use crate::Result;
}
