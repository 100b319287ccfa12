use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::Error;
use crate::schema::{Record, RecordKey};
use crate::vectorstores::memory::validate_vector;
use crate::vectorstores::MemoryVectorStore;
use crate::Result;

/// Current on-disk snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of a whole store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot<K> {
    /// Format version
    pub version: u32,
    /// Store dimension at save time
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Dimension the store was constructed with; unset when the first
    /// insert decides it
    #[serde(default)]
    pub fixed_dimension: Option<usize>,
    /// Every record, in id order
    pub records: Vec<Record<K>>,
}

/// A JSON file holding one store snapshot
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a snapshot store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a snapshot has been written
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Write every record of `store` to the backing file.
    ///
    /// The snapshot is written to a sibling temp file and renamed into place,
    /// so a crash never leaves a half-written snapshot behind.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn save<K>(&self, store: &MemoryVectorStore<K>) -> Result<usize>
    where
        K: RecordKey + Serialize,
    {
        let snapshot = store.all()?;
        let document = StoreSnapshot {
            version: SNAPSHOT_VERSION,
            dimension: snapshot.dimension(),
            fixed_dimension: store.fixed_dimension(),
            records: snapshot.iter().cloned().collect(),
        };
        let json = serde_json::to_string(&document)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let temp = self.temp_path();
        let written = match fs::write(&temp, json).await {
            Ok(()) => fs::rename(&temp, &self.path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(err.into());
        }

        debug!(records = document.records.len(), "Saved store snapshot");
        Ok(document.records.len())
    }

    /// Rebuild a store from the backing file.
    ///
    /// Every record is re-validated; a snapshot with a bad record fails as a
    /// whole rather than producing a partially loaded store. Only a store
    /// saved with a pinned dimension comes back pinned.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn load<K>(&self) -> Result<MemoryVectorStore<K>>
    where
        K: RecordKey + DeserializeOwned,
    {
        let content = fs::read_to_string(&self.path).await?;
        let snapshot: StoreSnapshot<K> = serde_json::from_str(&content)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::InvalidArgument(format!(
                "unsupported snapshot version {}, expected {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        if let (Some(fixed), Some(dimension)) = (snapshot.fixed_dimension, snapshot.dimension) {
            if fixed != dimension {
                return Err(Error::dimension_mismatch(fixed, dimension));
            }
        }
        if let Some(dimension) = snapshot.dimension {
            for record in &snapshot.records {
                validate_vector(&record.vector, Some(dimension))?;
            }
        }

        let store = match snapshot.fixed_dimension {
            Some(dimension) => MemoryVectorStore::with_dimension(dimension)?,
            None => MemoryVectorStore::new(),
        };
        let count = snapshot.records.len();
        store.insert_batch(snapshot.records)?;

        debug!(records = count, "Loaded store snapshot");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Metadata;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileSnapshotStore::new(dir.path().join("nested").join("store.json"));

        let store: MemoryVectorStore<String> = MemoryVectorStore::new();
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("chapter-3"));
        store
            .insert("a".to_string(), vec![1.0, 0.0], metadata)
            .unwrap();
        store
            .insert("b".to_string(), vec![0.0, 1.0], Metadata::new())
            .unwrap();

        assert!(!file.exists().await);
        assert_eq!(file.save(&store).await.unwrap(), 2);
        assert!(file.exists().await);

        let loaded: MemoryVectorStore<String> = file.load().await.unwrap();
        assert_eq!(loaded.size().unwrap(), 2);
        assert_eq!(loaded.dimension().unwrap(), Some(2));
        assert_eq!(
            loaded.get(&"a".to_string()).unwrap(),
            store.get(&"a".to_string()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_store_keeps_fixed_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileSnapshotStore::new(dir.path().join("store.json"));

        let store: MemoryVectorStore<u64> = MemoryVectorStore::with_dimension(8).unwrap();
        file.save(&store).await.unwrap();

        let loaded: MemoryVectorStore<u64> = file.load().await.unwrap();
        assert!(loaded.is_empty().unwrap());
        assert_eq!(loaded.dimension().unwrap(), Some(8));
    }

    #[tokio::test]
    async fn test_unpinned_store_stays_unpinned_after_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileSnapshotStore::new(dir.path().join("store.json"));

        let store: MemoryVectorStore<String> = MemoryVectorStore::new();
        store
            .insert("a".to_string(), vec![1.0, 0.0], Metadata::new())
            .unwrap();
        file.save(&store).await.unwrap();

        let loaded: MemoryVectorStore<String> = file.load().await.unwrap();
        assert_eq!(loaded.fixed_dimension(), None);
        assert_eq!(loaded.dimension().unwrap(), Some(2));

        loaded.delete(&"a".to_string()).unwrap();
        assert_eq!(loaded.dimension().unwrap(), None);
        loaded
            .insert("b".to_string(), vec![1.0, 0.0, 0.0], Metadata::new())
            .unwrap();
        assert_eq!(loaded.dimension().unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_pinned_store_stays_pinned_after_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileSnapshotStore::new(dir.path().join("store.json"));

        let store: MemoryVectorStore<u64> = MemoryVectorStore::with_dimension(2).unwrap();
        store.insert(1, vec![1.0, 0.0], Metadata::new()).unwrap();
        file.save(&store).await.unwrap();

        let loaded: MemoryVectorStore<u64> = file.load().await.unwrap();
        assert_eq!(loaded.fixed_dimension(), Some(2));
        loaded.delete(&1).unwrap();
        assert_eq!(loaded.dimension().unwrap(), Some(2));
        assert!(loaded
            .insert(2, vec![1.0, 0.0, 0.0], Metadata::new())
            .unwrap_err()
            .is_dimension_mismatch());
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("store.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("occupied"), b"x").unwrap();
        let file = FileSnapshotStore::new(&target);

        let store: MemoryVectorStore<String> = MemoryVectorStore::new();
        store
            .insert("a".to_string(), vec![1.0], Metadata::new())
            .unwrap();

        let result = file.save(&store).await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!file.temp_path().exists());
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_records_must_match_saved_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(
            &path,
            r#"{"version": 1, "dimension": 2, "records": [
                {"id": "a", "vector": [1.0, 0.0, 0.0]}
            ]}"#,
        )
        .await
        .unwrap();

        let result = FileSnapshotStore::new(&path).load::<String>().await;
        assert!(result.unwrap_err().is_dimension_mismatch());

        fs::write(
            &path,
            r#"{"version": 1, "dimension": 3, "fixed_dimension": 2, "records": []}"#,
        )
        .await
        .unwrap();
        let result = FileSnapshotStore::new(&path).load::<String>().await;
        assert!(result.unwrap_err().is_dimension_mismatch());
    }

    #[tokio::test]
    async fn test_inconsistent_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(
            &path,
            r#"{"version": 1, "dimension": 2, "records": [
                {"id": "a", "vector": [1.0, 0.0]},
                {"id": "b", "vector": [1.0, 0.0, 0.0]}
            ]}"#,
        )
        .await
        .unwrap();

        let result = FileSnapshotStore::new(&path).load::<String>().await;
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"{"version": 9, "records": []}"#)
            .await
            .unwrap();

        let result = FileSnapshotStore::new(&path).load::<String>().await;
        assert!(result.unwrap_err().is_invalid_argument());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSnapshotStore::new(dir.path().join("absent.json"))
            .load::<String>()
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
