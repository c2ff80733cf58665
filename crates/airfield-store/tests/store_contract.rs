use std::sync::{Arc, Mutex};

use airfield_core::id::TaskId;
use airfield_store::{
    Collection, CollectionStore, LocalStore, RawTask, RealtimeStore, StoreError, StoredRecord,
};
use serde_json::json;
use tempfile::tempdir;

fn records() -> Vec<StoredRecord> {
    (1..=3)
        .rev()
        .map(|id| StoredRecord {
            id: TaskId(1_700_000_000_000 + id),
            body: json!({"id": 1_700_000_000_000_i64 + id, "dueDate": "2025-01-01"}),
        })
        .collect()
}

fn assert_round_trip(store: &dyn CollectionStore) -> Result<(), StoreError> {
    store.save(Collection::Ppm, &records())?;
    let loaded = store.load(Collection::Ppm)?;
    let ids: Vec<i64> = loaded
        .iter()
        .filter_map(|record| record["id"].as_i64())
        .collect();
    assert_eq!(
        ids,
        vec![1_700_000_000_003, 1_700_000_000_002, 1_700_000_000_001],
        "{} store must return saved records newest first",
        store.name()
    );
    assert!(store.load(Collection::Cm)?.is_empty());

    store.save(Collection::Ppm, &records()[..1])?;
    assert_eq!(store.load(Collection::Ppm)?.len(), 1);
    Ok(())
}

#[test]
fn local_store_round_trips() -> Result<(), StoreError> {
    let dir = tempdir().map_err(|source| StoreError::Write {
        path: std::env::temp_dir(),
        source,
    })?;
    assert_round_trip(&LocalStore::new(dir.path()))
}

#[test]
fn realtime_store_round_trips() -> Result<(), StoreError> {
    assert_round_trip(&RealtimeStore::new())
}

#[test]
fn legacy_array_backups_load() -> Result<(), StoreError> {
    let dir = tempdir().map_err(|source| StoreError::Write {
        path: std::env::temp_dir(),
        source,
    })?;
    let store = LocalStore::new(dir.path());
    let path = store.path_for(Collection::Cm);
    std::fs::write(&path, r#"[{"id": 5}, {"id": 6}]"#)
        .map_err(|source| StoreError::Write { path, source })?;
    assert_eq!(store.load(Collection::Cm)?.len(), 2);
    Ok(())
}

#[test]
fn own_writes_echo_to_subscribers() -> Result<(), StoreError> {
    let store = RealtimeStore::new();
    let echoes: Arc<Mutex<Vec<Collection>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&echoes);
    let _handle = store.subscribe(
        Collection::Ppm,
        Arc::new(move |collection: Collection, _: &[RawTask]| {
            if let Ok(mut echoes) = sink.lock() {
                echoes.push(collection);
            }
        }),
    )?;
    store.save(Collection::Ppm, &records())?;
    store.save(Collection::Cm, &records())?;
    let echoes = echoes.lock().map_err(|_| StoreError::LockError)?;
    assert_eq!(*echoes, vec![Collection::Ppm]);
    Ok(())
}
