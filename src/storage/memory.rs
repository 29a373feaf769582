//! In-memory timer store
//!
//! State is lost on restart. Access is serialized with a tokio `RwLock`, so a
//! tick holds the write lock for the whole pass over the table.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::clock::SharedClock;
use crate::error::Result;
use crate::models::{NewTimer, SortKey, TimerId, TimerPatch, TimerRecord};

use super::table::TimerTable;
use super::TimerStore;

pub struct MemoryTimerStore {
    table: RwLock<TimerTable>,
    clock: SharedClock,
}

impl MemoryTimerStore {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_table(TimerTable::new(), clock)
    }

    /// Start from existing records
    pub fn with_table(table: TimerTable, clock: SharedClock) -> Self {
        Self {
            table: RwLock::new(table),
            clock,
        }
    }
}

#[async_trait]
impl TimerStore for MemoryTimerStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, new_timer: NewTimer) -> Result<TimerRecord> {
        let mut table = self.table.write().await;
        let record = table.create(new_timer, self.clock.utc())?;
        tracing::debug!(id = %record.id, pseudo = %record.pseudo, "Timer created");
        Ok(record)
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
        let mut table = self.table.write().await;
        table.update(id, &patch, self.clock.utc())
    }

    async fn delete(&self, id: &TimerId) -> Result<TimerRecord> {
        let record = self.table.write().await.delete(id)?;
        tracing::debug!(id = %record.id, pseudo = %record.pseudo, "Timer deleted");
        Ok(record)
    }

    async fn tick(&self) -> Result<usize> {
        let mut table = self.table.write().await;
        Ok(table.tick(self.clock.utc()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.read().await.len())
    }
}
