use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    ChangeCallback, Collection, CollectionStore, RawTask, StoreError, StoreResult, StoredRecord,
    SubscriptionHandle, records_from_value,
};

/// Backup store keeping one JSON file per collection in a data directory.
///
/// Files are named after the collection's backup key, e.g.
/// `agl_ppm_tasks.json`, and hold a JSON array in list order. Writes go through a temporary file in the same
/// directory and are renamed into place.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a collection.
    #[must_use]
    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.backup_key()))
    }
}

impl CollectionStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    fn load(&self, collection: Collection) -> StoreResult<Vec<RawTask>> {
        let path = self.path_for(collection);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no backup file yet");
                return Ok(Vec::new());
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let value: Value = serde_json::from_str(&raw)
            .map_err(|source| StoreError::Decode { collection, source })?;
        let records = records_from_value(collection, value)?;
        debug!(%collection, count = records.len(), "loaded local backup");
        Ok(records)
    }

    fn save(&self, collection: Collection, records: &[StoredRecord]) -> StoreResult<()> {
        let path = self.path_for(collection);
        let list: Vec<&Value> = records.iter().map(|record| &record.body).collect();
        let body = serde_json::to_vec_pretty(&list)
            .map_err(|source| StoreError::Encode { collection, source })?;

        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(&body).map_err(write_err)?;
        tmp.persist(&path).map_err(|err| write_err(err.error))?;

        info!(%collection, count = records.len(), path = %path.display(), "saved local backup");
        Ok(())
    }

    fn subscribe(
        &self,
        _collection: Collection,
        _callback: ChangeCallback,
    ) -> StoreResult<SubscriptionHandle> {
        Ok(SubscriptionHandle::inert())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airfield_core::id::TaskId;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = LocalStore::new(dir.path());
        let records = store
            .load(Collection::Ppm)
            .unwrap_or_else(|err| panic!("load must succeed: {err}"));
        assert!(records.is_empty());
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = LocalStore::new(dir.path());
        fs::write(store.path_for(Collection::Cm), "{not json")
            .unwrap_or_else(|err| panic!("write: {err}"));
        assert!(matches!(
            store.load(Collection::Cm),
            Err(StoreError::Decode { .. })
        ));
    }

    #[test]
    fn save_creates_directory_and_keeps_list_order() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = LocalStore::new(dir.path().join("nested"));
        let records = vec![
            StoredRecord {
                id: TaskId(42),
                body: json!({"id": 42, "description": "Check windsock"}),
            },
            StoredRecord {
                id: TaskId(7),
                body: json!({"id": 7, "description": "Replace lamp"}),
            },
            StoredRecord {
                id: TaskId(100),
                body: json!({"id": 100, "description": "Align PAPI"}),
            },
        ];
        store
            .save(Collection::Ppm, &records)
            .unwrap_or_else(|err| panic!("save must succeed: {err}"));

        let raw = fs::read_to_string(store.path_for(Collection::Ppm))
            .unwrap_or_else(|err| panic!("read: {err}"));
        let value: Value = serde_json::from_str(&raw).unwrap_or_else(|err| panic!("json: {err}"));
        assert_eq!(value[0]["description"], "Check windsock");

        let ids: Vec<i64> = store
            .load(Collection::Ppm)
            .unwrap_or_else(|err| panic!("load must succeed: {err}"))
            .iter()
            .filter_map(|record| record["id"].as_i64())
            .collect();
        assert_eq!(ids, vec![42, 7, 100]);
    }
}
