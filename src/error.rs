use std::io;
use thiserror::Error;

/// Error type for the retrieval engine
#[derive(Error, Debug)]
pub enum Error {
    /// A vector's length disagrees with the store's fixed dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A structurally invalid request (e.g. top_k of zero, NaN components)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A record required to exist was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Embedding provider error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Other general errors
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Error::DimensionMismatch { expected, actual }
    }

    /// Whether this error reports a dimensionality violation
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Error::DimensionMismatch { .. })
    }

    /// Whether this error reports an invalid argument
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}
