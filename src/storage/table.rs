//! Indexed in-memory timer table
//!
//! Records live in a `BTreeMap` keyed by an insertion sequence number, so
//! iteration order is creation order and stable sorts break ties the same way
//! on every backend. Secondary indexes map id and pseudo to that sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, TimerError};
use crate::models::{clamp_limit, NewTimer, SortKey, TimerId, TimerPatch, TimerRecord};

/// Collection of timers with id and pseudo indexes
#[derive(Debug, Clone, Default)]
pub struct TimerTable {
    records: BTreeMap<u64, TimerRecord>,
    by_id: HashMap<TimerId, u64>,
    by_pseudo: HashMap<String, u64>,
    next_seq: u64,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from records in insertion order
    ///
    /// Fails if two records share an id or a pseudo.
    pub fn from_records(records: impl IntoIterator<Item = TimerRecord>) -> Result<Self> {
        let mut table = Self::new();
        for record in records {
            if table.by_id.contains_key(&record.id) {
                return Err(TimerError::storage(format!(
                    "duplicate timer id in stored data: {}",
                    record.id
                )));
            }
            if table.by_pseudo.contains_key(&record.pseudo) {
                return Err(TimerError::storage(format!(
                    "duplicate pseudo in stored data: {}",
                    record.pseudo
                )));
            }
            table.insert(record);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order
    pub fn records(&self) -> impl Iterator<Item = &TimerRecord> {
        self.records.values()
    }

    pub fn create(&mut self, new_timer: NewTimer, now: DateTime<Utc>) -> Result<TimerRecord> {
        new_timer.validate()?;
        if self.by_pseudo.contains_key(&new_timer.pseudo) {
            return Err(TimerError::duplicate(new_timer.pseudo));
        }

        let record = TimerRecord::new(TimerId::generate(), new_timer, now);
        self.insert(record.clone());
        Ok(record)
    }

    pub fn list(&self, key: SortKey, limit: i64) -> Vec<TimerRecord> {
        let mut rows: Vec<&TimerRecord> = self.records.values().collect();
        // sort_by is stable: equal keys keep insertion order
        rows.sort_by(|a, b| b.sort_value(key).cmp(&a.sort_value(key)));
        rows.into_iter().take(clamp_limit(limit)).cloned().collect()
    }

    pub fn get_by_pseudo(&self, pseudo: &str) -> Result<TimerRecord> {
        self.by_pseudo
            .get(pseudo)
            .and_then(|seq| self.records.get(seq))
            .cloned()
            .ok_or_else(|| TimerError::not_found(pseudo))
    }

    pub fn get_by_id(&self, id: &TimerId) -> Result<TimerRecord> {
        self.by_id
            .get(id)
            .and_then(|seq| self.records.get(seq))
            .cloned()
            .ok_or_else(|| TimerError::not_found(id.to_string()))
    }

    pub fn update(
        &mut self,
        id: &TimerId,
        patch: &TimerPatch,
        now: DateTime<Utc>,
    ) -> Result<TimerRecord> {
        let record = self
            .by_id
            .get(id)
            .and_then(|seq| self.records.get_mut(seq))
            .ok_or_else(|| TimerError::not_found(id.to_string()))?;

        record.apply(patch, now)?;
        Ok(record.clone())
    }

    pub fn delete(&mut self, id: &TimerId) -> Result<TimerRecord> {
        let seq = self
            .by_id
            .remove(id)
            .ok_or_else(|| TimerError::not_found(id.to_string()))?;
        let record = self
            .records
            .remove(&seq)
            .ok_or_else(|| TimerError::storage(format!("index points at missing record {id}")))?;
        self.by_pseudo.remove(&record.pseudo);
        Ok(record)
    }

    /// Advance every running timer by one second
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        self.records
            .values_mut()
            .map(|record| record.advance(now))
            .filter(|advanced| *advanced)
            .count()
    }

    fn insert(&mut self, record: TimerRecord) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_id.insert(record.id, seq);
        self.by_pseudo.insert(record.pseudo.clone(), seq);
        self.records.insert(seq, record);
    }
}

/// On-disk form of a [`TimerTable`]
#[derive(Debug, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub timers: Vec<TimerRecord>,
}

impl TableSnapshot {
    pub const VERSION: u32 = 1;

    pub fn capture(table: &TimerTable, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: Self::VERSION,
            saved_at,
            timers: table.records().cloned().collect(),
        }
    }

    pub fn into_table(self) -> Result<TimerTable> {
        if self.version != Self::VERSION {
            return Err(TimerError::storage(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        TimerTable::from_records(self.timers)
    }
}
