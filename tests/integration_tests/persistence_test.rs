//! Reopening persistent stores

use std::fs;
use tempfile::TempDir;

use chronometer::clock::system_clock;
use chronometer::config::{StorageBackend, StorageConfig};
use chronometer::error::TimerError;
use chronometer::models::{NewTimer, SortKey, TimerPatch};
use chronometer::storage::{open_store, FileTimerStore, SqliteTimerStore, TimerStore};

async fn fill(store: &dyn TimerStore) {
    for (name, secs) in [("zed", 4), ("amy", 4), ("kim", 9)] {
        let rec = store.create(NewTimer::new(name)).await.unwrap();
        store
            .update(&rec.id, TimerPatch::default().seconds(secs).running(false))
            .await
            .unwrap();
    }
}

async fn order(store: &dyn TimerStore) -> Vec<String> {
    store
        .list(SortKey::Seconds, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.pseudo)
        .collect()
}

#[tokio::test]
async fn test_file_store_survives_reopen_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("timers.json");

    let before = {
        let store = FileTimerStore::open(&path, system_clock()).unwrap();
        fill(&store).await;
        order(&store).await
    };
    assert_eq!(before, vec!["kim", "zed", "amy"]);

    let reopened = FileTimerStore::open(&path, system_clock()).unwrap();
    assert_eq!(order(&reopened).await, before);
}

#[tokio::test]
async fn test_sqlite_store_survives_reopen_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("timers.db");

    let before = {
        let store = SqliteTimerStore::open(&path, system_clock()).unwrap();
        fill(&store).await;
        order(&store).await
    };

    let reopened = SqliteTimerStore::open(&path, system_clock()).unwrap();
    assert_eq!(order(&reopened).await, before);
    assert_eq!(reopened.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_open_store_selects_backend() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig {
        backend: StorageBackend::Sqlite,
        snapshot_path: dir.path().join("unused.json"),
        sqlite_path: dir.path().join("data/timers.db"),
    };

    let store = open_store(&config, system_clock()).unwrap();
    assert_eq!(store.backend(), "sqlite");
    store.create(NewTimer::new("alice")).await.unwrap();
    assert!(config.sqlite_path.exists());

    let config = StorageConfig {
        backend: StorageBackend::File,
        ..config
    };
    let store = open_store(&config, system_clock()).unwrap();
    assert_eq!(store.backend(), "file");
}

#[test]
fn test_corrupt_snapshot_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("timers.json");
    fs::write(&path, r#"{"version": 1, "savedAt": "x"}"#).unwrap();

    let result = FileTimerStore::open(&path, system_clock());
    assert!(matches!(result, Err(TimerError::Storage { .. })));
}

#[test]
fn test_snapshot_with_duplicate_pseudos_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("timers.json");
    let record = |id: &str| {
        serde_json::json!({
            "id": id,
            "pseudo": "twin",
            "description": "",
            "seconds": 0,
            "isRunning": true,
            "createdAt": "2024-01-01T00:00:00Z",
            "lastUpdated": "2024-01-01T00:00:00Z"
        })
    };
    let snapshot = serde_json::json!({
        "version": 1,
        "saved_at": "2024-01-01T00:00:00Z",
        "timers": [
            record("6f1c2a7e-0a51-4d0e-9a3c-3a0f8b2d1e01"),
            record("6f1c2a7e-0a51-4d0e-9a3c-3a0f8b2d1e02"),
        ]
    });
    fs::write(&path, snapshot.to_string()).unwrap();

    let result = FileTimerStore::open(&path, system_clock());
    assert!(matches!(result, Err(TimerError::Storage { .. })));
}
