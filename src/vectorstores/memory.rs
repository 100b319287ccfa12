use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::Error;
use crate::schema::{Metadata, Record, RecordKey};
use crate::Result;

type RecordMap<K> = BTreeMap<K, Arc<Record<K>>>;

/// Mutable state guarded by the store's lock
#[derive(Debug)]
struct StoreState<K: RecordKey> {
    /// Records keyed by id, shared copy-on-write with live snapshots
    records: Arc<RecordMap<K>>,
    /// Dimensionality of every stored vector, once known
    dimension: Option<usize>,
}

/// An in-memory vector store.
///
/// Holds `(id, vector, metadata)` records of one fixed dimensionality. The
/// dimension is either given up front with [`MemoryVectorStore::with_dimension`]
/// or fixed by the first insert into an empty store.
///
/// Readers never block each other. [`MemoryVectorStore::all`] hands out an
/// immutable [`Snapshot`]; a mutation made while a snapshot is alive copies
/// the record map, so the snapshot keeps seeing the pre-mutation state.
#[derive(Debug)]
pub struct MemoryVectorStore<K: RecordKey = String> {
    state: RwLock<StoreState<K>>,
    /// Dimension pinned at construction; never reset
    fixed_dimension: Option<usize>,
}

impl<K: RecordKey> Default for MemoryVectorStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RecordKey> MemoryVectorStore<K> {
    /// Create an empty store whose dimension is set by the first insert
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                records: Arc::new(BTreeMap::new()),
                dimension: None,
            }),
            fixed_dimension: None,
        }
    }

    /// Create an empty store that only accepts vectors of `dimension`
    pub fn with_dimension(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidArgument(
                "store dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            state: RwLock::new(StoreState {
                records: Arc::new(BTreeMap::new()),
                dimension: Some(dimension),
            }),
            fixed_dimension: Some(dimension),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState<K>>> {
        self.state
            .read()
            .map_err(|_| Error::Other("Failed to acquire read lock on vector store".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState<K>>> {
        self.state
            .write()
            .map_err(|_| Error::Other("Failed to acquire write lock on vector store".to_string()))
    }

    /// Insert a record, replacing any record with the same id.
    ///
    /// Fails with [`Error::DimensionMismatch`] if the vector's length differs
    /// from the store's dimension, and with [`Error::InvalidArgument`] if the
    /// vector is empty or has non-finite components. A failed insert leaves
    /// the store untouched.
    pub fn insert(&self, id: K, vector: Vec<f64>, metadata: Metadata) -> Result<()> {
        let mut state = self.write()?;
        validate_vector(&vector, state.dimension)?;

        let dimension = vector.len();
        let record = Arc::new(Record {
            id: id.clone(),
            vector,
            metadata,
        });
        let replaced = Arc::make_mut(&mut state.records)
            .insert(id.clone(), record)
            .is_some();
        state.dimension = Some(dimension);

        debug!(id = ?id, dimension, replaced, "Inserted record");
        Ok(())
    }

    /// Insert a prebuilt record
    pub fn insert_record(&self, record: Record<K>) -> Result<()> {
        self.insert(record.id, record.vector, record.metadata)
    }

    /// Insert many records atomically.
    ///
    /// Every vector is validated before the store is touched; if any record
    /// is rejected nothing is inserted. Later records win over earlier ones
    /// with the same id.
    pub fn insert_batch(&self, records: Vec<Record<K>>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut state = self.write()?;
        let mut dimension = state.dimension;
        for record in &records {
            validate_vector(&record.vector, dimension)?;
            dimension = Some(record.vector.len());
        }

        let count = records.len();
        let map = Arc::make_mut(&mut state.records);
        for record in records {
            map.insert(record.id.clone(), Arc::new(record));
        }
        state.dimension = dimension;

        debug!(count, dimension = ?dimension, "Inserted record batch");
        Ok(())
    }

    /// Delete a record by id. Returns whether a record was removed.
    pub fn delete(&self, id: &K) -> Result<bool> {
        let mut state = self.write()?;
        if !state.records.contains_key(id) {
            return Ok(false);
        }

        Arc::make_mut(&mut state.records).remove(id);
        if state.records.is_empty() {
            state.dimension = self.fixed_dimension;
        }

        debug!(id = ?id, remaining = state.records.len(), "Deleted record");
        Ok(true)
    }

    /// Delete a record that must exist, returning it.
    ///
    /// Fails with [`Error::NotFound`] when no record has this id.
    pub fn remove(&self, id: &K) -> Result<Record<K>> {
        let mut state = self.write()?;
        let removed = Arc::make_mut(&mut state.records)
            .remove(id)
            .ok_or_else(|| Error::NotFound(format!("Record not found: {:?}", id)))?;
        if state.records.is_empty() {
            state.dimension = self.fixed_dimension;
        }

        debug!(id = ?id, remaining = state.records.len(), "Removed record");
        Ok(Arc::try_unwrap(removed).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Get a copy of the record with this id
    pub fn get(&self, id: &K) -> Result<Option<Record<K>>> {
        let state = self.read()?;
        Ok(state.records.get(id).map(|record| (**record).clone()))
    }

    /// Get a record that must exist.
    ///
    /// Fails with [`Error::NotFound`] when no record has this id.
    pub fn require(&self, id: &K) -> Result<Record<K>> {
        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("Record not found: {:?}", id)))
    }

    /// Check whether a record with this id exists
    pub fn contains(&self, id: &K) -> Result<bool> {
        Ok(self.read()?.records.contains_key(id))
    }

    /// Current number of records
    pub fn size(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    /// Alias for [`MemoryVectorStore::size`]
    pub fn len(&self) -> Result<usize> {
        self.size()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    /// The store's dimension, if fixed yet
    pub fn dimension(&self) -> Result<Option<usize>> {
        Ok(self.read()?.dimension)
    }

    /// Dimension pinned at construction, if any
    pub fn fixed_dimension(&self) -> Option<usize> {
        self.fixed_dimension
    }

    /// Remove every record
    pub fn clear(&self) -> Result<()> {
        let mut state = self.write()?;
        let removed = state.records.len();
        state.records = Arc::new(BTreeMap::new());
        state.dimension = self.fixed_dimension;

        debug!(removed, "Cleared vector store");
        Ok(())
    }

    /// Take a point-in-time view of every record for scanning
    pub fn all(&self) -> Result<Snapshot<K>> {
        let state = self.read()?;
        Ok(Snapshot {
            records: Arc::clone(&state.records),
            dimension: state.dimension,
        })
    }
}

/// Check a vector against a store dimension (or any dimension if unset).
pub(crate) fn validate_vector(vector: &[f64], dimension: Option<usize>) -> Result<()> {
    match dimension {
        Some(expected) if vector.len() != expected => {
            return Err(Error::dimension_mismatch(expected, vector.len()));
        }
        None if vector.is_empty() => {
            return Err(Error::InvalidArgument(
                "vector must have at least one component".to_string(),
            ));
        }
        _ => {}
    }
    validate_finite(vector)
}

/// Reject NaN and infinite components.
pub(crate) fn validate_finite(vector: &[f64]) -> Result<()> {
    match vector.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(Error::InvalidArgument(format!(
            "non-finite value {} at index {}",
            vector[i], i
        ))),
        None => Ok(()),
    }
}

/// An immutable, point-in-time view of a store's records.
///
/// Iteration is in ascending id order. Each call to [`Snapshot::iter`] starts
/// a fresh pass over the same records, regardless of later store mutations.
#[derive(Debug, Clone)]
pub struct Snapshot<K: RecordKey> {
    records: Arc<RecordMap<K>>,
    dimension: Option<usize>,
}

impl<K: RecordKey> Snapshot<K> {
    /// Iterate over the records in this snapshot
    pub fn iter(&self) -> SnapshotIter<'_, K> {
        SnapshotIter {
            inner: self.records.values(),
        }
    }

    /// Number of records in this snapshot
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dimension of the store when the snapshot was taken
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

impl<'a, K: RecordKey> IntoIterator for &'a Snapshot<K> {
    type Item = &'a Record<K>;
    type IntoIter = SnapshotIter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the records of a [`Snapshot`]
pub struct SnapshotIter<'a, K: RecordKey> {
    inner: btree_map::Values<'a, K, Arc<Record<K>>>,
}

impl<'a, K: RecordKey> Iterator for SnapshotIter<'a, K> {
    type Item = &'a Record<K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|record| record.as_ref())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: RecordKey> ExactSizeIterator for SnapshotIter<'_, K> {}
