//! The station store: load and upsert station records.

use crate::error::StorageError;
use crate::record::StationRecord;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Storage collaborator consumed by the station controller.
///
/// Both operations are fallible: a real backend sits behind a network
/// connection. Implementations must be safe to share across tasks.
#[async_trait]
pub trait StationStore: Send + Sync {
    /// Loads the record for a station id, if one exists.
    async fn load_by_id(&self, id: u32) -> Result<Option<StationRecord>, StorageError>;

    /// Creates or replaces the record keyed by its id.
    async fn upsert(&self, record: &StationRecord) -> Result<(), StorageError>;
}

/// File-backed store: one `station_<id>.json` per record, with an in-memory
/// cache loaded at open and written through on upsert.
pub struct JsonStationStore {
    dir: PathBuf,
    cache: RwLock<HashMap<u32, StationRecord>>,
}

impl JsonStationStore {
    /// Opens or creates a store at the given directory and loads every
    /// existing record into the cache.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut cache = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let file = File::open(&path)?;
                let reader = BufReader::new(file);
                let record: StationRecord = serde_json::from_reader(reader)?;
                cache.insert(record.id, record);
            }
        }

        if !cache.is_empty() {
            tracing::info!("Loaded {} station record(s) from {}", cache.len(), dir.display());
        }

        Ok(Self {
            dir,
            cache: RwLock::new(cache),
        })
    }

    fn record_path(&self, id: u32) -> PathBuf {
        self.dir.join(format!("station_{id}.json"))
    }
}

#[async_trait]
impl StationStore for JsonStationStore {
    async fn load_by_id(&self, id: u32) -> Result<Option<StationRecord>, StorageError> {
        Ok(self.cache.read().get(&id).cloned())
    }

    async fn upsert(&self, record: &StationRecord) -> Result<(), StorageError> {
        let file = File::create(self.record_path(record.id))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, record)?;

        self.cache.write().insert(record.id, record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reworkd_core::StationState;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_record() {
        let dir = TempDir::new().unwrap();
        let store = JsonStationStore::open(dir.path()).unwrap();

        assert!(store.load_by_id(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonStationStore::open(dir.path()).unwrap();

        let record = StationRecord::new(7, StationState::WaitPallet, "choco_rework");
        store.upsert(&record).await.unwrap();

        let loaded = store.load_by_id(7).await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let dir = TempDir::new().unwrap();
        let store = JsonStationStore::open(dir.path()).unwrap();

        let mut record = StationRecord::new(7, StationState::WaitPallet, "choco_rework");
        store.upsert(&record).await.unwrap();
        record.enter_state(StationState::ScanPallet);
        store.upsert(&record).await.unwrap();

        let loaded = store.load_by_id(7).await.unwrap().unwrap();
        assert_eq!(loaded.status, "scan_pallet");
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = JsonStationStore::open(dir.path()).unwrap();
            let record = StationRecord::new(9, StationState::Maintenance, "choco_rework");
            store.upsert(&record).await.unwrap();
        }

        let reopened = JsonStationStore::open(dir.path()).unwrap();
        let loaded = reopened.load_by_id(9).await.unwrap().unwrap();
        assert_eq!(loaded.status, "maintenance");
    }

    #[test]
    fn test_corrupt_file_fails_open() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("station_1.json"), "not json").unwrap();

        assert!(matches!(
            JsonStationStore::open(dir.path()),
            Err(StorageError::Json(_))
        ));
    }
}
