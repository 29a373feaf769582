//! JSON snapshot timer store
//!
//! The whole table lives in memory and is written to a single JSON file after
//! every mutation. Writes go to a sibling `.tmp` file first and are renamed
//! into place, so a crash mid-write leaves the previous snapshot intact.
//!
//! A mutation is applied to a copy of the table; the live table is only
//! replaced once the copy has been persisted. If persisting fails the store
//! still reflects the last successful write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::clock::SharedClock;
use crate::error::{Result, TimerError};
use crate::models::{NewTimer, SortKey, TimerId, TimerPatch, TimerRecord};

use super::table::{TableSnapshot, TimerTable};
use super::TimerStore;

pub struct FileTimerStore {
    table: RwLock<TimerTable>,
    path: PathBuf,
    clock: SharedClock,
}

impl FileTimerStore {
    /// Open a snapshot file, starting empty if it does not exist yet
    pub fn open(path: impl AsRef<Path>, clock: SharedClock) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table = load_snapshot(&path)?;

        tracing::info!(
            path = %path.display(),
            timers = table.len(),
            "Snapshot store initialized"
        );

        Ok(Self {
            table: RwLock::new(table),
            path,
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `op` to a copy of the table, persist it, then make it live
    async fn mutate<T>(
        &self,
        op: impl FnOnce(&mut TimerTable, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let mut live = self.table.write().await;
        let mut next = live.clone();
        let now = self.clock.utc();

        let out = op(&mut next, now)?;
        self.persist(&next, now).await?;

        *live = next;
        Ok(out)
    }

    /// Write `table` on the blocking pool so disk latency stays off the runtime
    async fn persist(&self, table: &TimerTable, now: DateTime<Utc>) -> Result<()> {
        let snapshot = TableSnapshot::capture(table, now);
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || save_snapshot(&path, &snapshot))
            .await
            .map_err(|e| TimerError::with_source("snapshot writer panicked", e))?
    }
}

fn load_snapshot(path: &Path) -> Result<TimerTable> {
    if !path.exists() {
        return Ok(TimerTable::new());
    }

    let file = File::open(path).map_err(|e| {
        TimerError::with_source(format!("failed to open snapshot {}", path.display()), e)
    })?;
    let snapshot: TableSnapshot = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        TimerError::with_source(format!("corrupt snapshot {}", path.display()), e)
    })?;

    snapshot.into_table()
}

fn save_snapshot(path: &Path, snapshot: &TableSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "timers.json".to_string());
    let temp_path = path.with_file_name(format!("{file_name}.tmp"));

    let file = File::create(&temp_path).map_err(|e| {
        TimerError::with_source(format!("failed to create {}", temp_path.display()), e)
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| TimerError::with_source("failed to flush snapshot", e.into_error()))?
        .sync_all()?;

    fs::rename(&temp_path, path).map_err(|e| {
        TimerError::with_source(format!("failed to replace snapshot {}", path.display()), e)
    })?;

    tracing::trace!(path = %path.display(), timers = snapshot.timers.len(), "Snapshot saved");
    Ok(())
}

#[async_trait]
impl TimerStore for FileTimerStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn create(&self, new_timer: NewTimer) -> Result<TimerRecord> {
        self.mutate(|table, now| table.create(new_timer, now)).await
    }

    async fn list(&self, key: SortKey, limit: i64) -> Result<Vec<TimerRecord>> {
        Ok(self.table.read().await.list(key, limit))
    }

    async fn get_by_pseudo(&self, pseudo: &str) -> Result<TimerRecord> {
        self.table.read().await.get_by_pseudo(pseudo)
    }

    async fn get_by_id(&self, id: &TimerId) -> Result<TimerRecord> {
        self.table.read().await.get_by_id(id)
    }

    async fn update(&self, id: &TimerId, patch: TimerPatch) -> Result<TimerRecord> {
        self.mutate(|table, now| table.update(id, &patch, now)).await
    }

    async fn delete(&self, id: &TimerId) -> Result<TimerRecord> {
        self.mutate(|table, _| table.delete(id)).await
    }

    async fn tick(&self) -> Result<usize> {
        let mut live = self.table.write().await;
        let mut next = live.clone();
        let now = self.clock.utc();

        let advanced = next.tick(now);
        // Nothing moved, nothing to write
        if advanced == 0 {
            return Ok(0);
        }

        self.persist(&next, now).await?;
        *live = next;
        Ok(advanced)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.read().await.len())
    }
}
