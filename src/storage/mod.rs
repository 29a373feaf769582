//! Timer storage
//!
//! This module provides the [`TimerStore`] trait and its backends. Handlers
//! and the ticker only ever see a [`SharedTimerStore`], so the backend is a
//! configuration choice:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              HTTP handlers / tick scheduler                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TimerStore trait                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │     Memory      │ │  JSON snapshot  │ │     SQLite      │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```
//!
//! Every backend serializes access: a tick and a concurrent update to the same
//! record never interleave, and a failed operation leaves state unchanged.

pub mod file;
pub mod memory;
pub mod sqlite;
pub mod table;

use async_trait::async_trait;
use std::sync::Arc;

use crate::clock::SharedClock;
use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::models::{NewTimer, SortKey, TimerId, TimerPatch, TimerRecord, RECENT_LIMIT};

pub use file::FileTimerStore;
pub use memory::MemoryTimerStore;
pub use sqlite::SqliteTimerStore;
pub use table::TimerTable;

/// Owner of all timer records
#[async_trait]
pub trait TimerStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Create a running timer at zero seconds
    ///
    /// Fails with `DuplicatePseudo` if the pseudo is taken.
    async fn create(&self, new_timer: NewTimer) -> Result<TimerRecord>;

    /// Records in descending order of `key`, at most `limit` of them
    async fn list(&self, key: SortKey, limit: i64) -> Result<Vec<TimerRecord>>;

    /// The five most recently updated timers
    async fn recent(&self) -> Result<Vec<TimerRecord>> {
        self.list(SortKey::LastUpdated, RECENT_LIMIT).await
    }

    async fn get_by_pseudo(&self, pseudo: &str) -> Result<TimerRecord>;

    async fn get_by_id(&self, id: &TimerId) -> Result<TimerRecord>;

    /// Apply the present fields of `patch` and refresh `lastUpdated`
    async fn update(&self, id: &TimerId, patch: TimerPatch) -> Result<TimerRecord>;

    /// Remove a timer, returning it
    async fn delete(&self, id: &TimerId) -> Result<TimerRecord>;

    /// Advance every running timer by one second, returning how many moved
    async fn tick(&self) -> Result<usize>;

    /// Number of stored timers
    async fn count(&self) -> Result<usize>;
}

/// Thread-safe shared store handle
pub type SharedTimerStore = Arc<dyn TimerStore>;

/// Open the backend selected by `config`
pub fn open_store(config: &StorageConfig, clock: SharedClock) -> Result<SharedTimerStore> {
    let store: SharedTimerStore = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryTimerStore::new(clock)),
        StorageBackend::File => Arc::new(FileTimerStore::open(&config.snapshot_path, clock)?),
        StorageBackend::Sqlite => Arc::new(SqliteTimerStore::open(&config.sqlite_path, clock)?),
    };

    tracing::info!(backend = store.backend(), "Timer store opened");
    Ok(store)
}
