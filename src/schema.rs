use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Opaque key-value metadata carried alongside a vector
pub type Metadata = HashMap<String, serde_json::Value>;

/// Trait for types that can identify a record in a vector store.
///
/// The type's `Ord` is the tie-break order used when two results score the
/// same: lexicographic for strings, numeric for integers.
pub trait RecordKey: Ord + Hash + Clone + Debug + Send + Sync + 'static {}

impl RecordKey for String {}
impl RecordKey for i32 {}
impl RecordKey for i64 {}
impl RecordKey for u32 {}
impl RecordKey for u64 {}
impl RecordKey for usize {}

/// A stored vector together with its identifier and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<K> {
    /// Caller-supplied identifier, unique within a store
    pub id: K,
    /// The embedding
    pub vector: Vec<f64>,
    /// Metadata, never interpreted by the engine
    #[serde(default)]
    pub metadata: Metadata,
}

impl<K> Record<K> {
    /// Create a record without metadata
    pub fn new(id: K, vector: Vec<f64>) -> Self {
        Self {
            id,
            vector,
            metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Dimensionality of the record's vector
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A single ranked match returned by a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<K> {
    /// Id of the matching record
    pub id: K,
    /// Similarity score (higher is more similar)
    pub score: f64,
    /// Copy of the matching record's metadata
    #[serde(default)]
    pub metadata: Metadata,
}

/// Document represents a piece of text and associated metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The document's content
    pub page_content: String,

    /// Metadata associated with the document
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a new document with the given content
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Create a new document with content and metadata
    pub fn with_metadata(page_content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }

    /// Set the document id (stored under the `"id"` metadata key)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.metadata
            .insert("id".to_string(), serde_json::Value::String(id.into()));
        self
    }

    /// The document id, if one was set as a string under `"id"`
    pub fn id(&self) -> Option<&str> {
        self.metadata.get("id").and_then(|v| v.as_str())
    }
}
