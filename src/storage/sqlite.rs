//! SQLite timer store
//!
//! Every mutation runs inside a transaction, so a failed update or a failed
//! tick leaves no partial state behind. Timestamps are stored as fixed-width
//! RFC 3339 text (microsecond precision, `Z` suffix), which sorts
//! chronologically as plain strings.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::clock::SharedClock;
use crate::error::{Result, TimerError};
use crate::models::{clamp_limit, NewTimer, SortKey, TimerId, TimerPatch, TimerRecord};

use super::TimerStore;

const SELECT_COLUMNS: &str =
    "SELECT id, pseudo, description, seconds, is_running, created_at, last_updated FROM timers";

/// SQLite-backed store
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteTimerStore {
    conn: Mutex<Connection>,
    clock: SharedClock,
}

impl SqliteTimerStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>, clock: SharedClock) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            TimerError::with_source(format!("failed to open database {}", path.display()), e)
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
            clock,
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite store initialized");
        Ok(store)
    }

    /// In-memory database (for testing)
    pub fn in_memory(clock: SharedClock) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            clock,
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS timers (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    pseudo TEXT NOT NULL UNIQUE,
                    description TEXT NOT NULL DEFAULT '',
                    seconds INTEGER NOT NULL DEFAULT 0 CHECK (seconds >= 0),
                    is_running INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    last_updated TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_timers_seconds ON timers(seconds);
                CREATE INDEX IF NOT EXISTS idx_timers_created_at ON timers(created_at);
                CREATE INDEX IF NOT EXISTS idx_timers_last_updated ON timers(last_updated);
                "#,
        )
        .map_err(|e| TimerError::with_source("failed to create schema", e))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TimerError::storage("database connection lock poisoned"))
    }

    // Stored text keeps microseconds; truncate up front so returned records
    // compare equal to what a later read produces.
    fn now(&self) -> DateTime<Utc> {
        self.clock.utc().trunc_subsecs(6)
    }

    fn create_sync(&self, new_timer: NewTimer) -> Result<TimerRecord> {
        new_timer.validate()?;
        let now = self.now();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM timers WHERE pseudo = ?1)",
            params![new_timer.pseudo],
            |row| row.get(0),
        )?;
        if taken {
            return Err(TimerError::duplicate(new_timer.pseudo));
        }

        let record = TimerRecord::new(TimerId::generate(), new_timer, now);
        tx.execute(
            "INSERT INTO timers (id, pseudo, description, seconds, is_running, created_at, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.pseudo,
                record.description,
                encode_seconds(record.seconds)?,
                record.is_running,
                encode_time(record.created_at),
                encode_time(record.last_updated),
            ],
        )
        .map_err(|e| map_unique_violation(e, &record.pseudo))?;
        tx.commit()?;

        Ok(record)
    }

    fn list_sync(&self, key: SortKey, limit: i64) -> Result<Vec<TimerRecord>> {
        let column = match key {
            SortKey::Seconds => "seconds",
            SortKey::CreatedAt => "created_at",
            SortKey::LastUpdated => "last_updated",
        };
        let limit = i64::try_from(clamp_limit(limit)).unwrap_or(i64::MAX);
        let query = format!("{SELECT_COLUMNS} ORDER BY {column} DESC, seq ASC LIMIT ?1");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params![limit], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn find_sync(&self, column: &str, value: &str) -> Result<Option<TimerRecord>> {
        let conn = self.lock()?;
        find_in(&conn, column, value)
    }

    fn update_sync(&self, id: &TimerId, patch: &TimerPatch) -> Result<TimerRecord> {
        let now = self.now();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut record =
            find_in(&tx, "id", &id.to_string())?.ok_or_else(|| TimerError::not_found(id.to_string()))?;
        record.apply(patch, now)?;

        tx.execute(
            "UPDATE timers SET seconds = ?1, is_running = ?2, description = ?3, last_updated = ?4
             WHERE id = ?5",
            params![
                encode_seconds(record.seconds)?,
                record.is_running,
                record.description,
                encode_time(record.last_updated),
                record.id.to_string(),
            ],
        )?;
        tx.commit()?;

        Ok(record)
    }

    fn delete_sync(&self, id: &TimerId) -> Result<TimerRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let record =
            find_in(&tx, "id", &id.to_string())?.ok_or_else(|| TimerError::not_found(id.to_string()))?;
        tx.execute("DELETE FROM timers WHERE id = ?1", params![record.id.to_string()])?;
        tx.commit()?;

        Ok(record)
    }

    fn tick_sync(&self) -> Result<usize> {
        let now = encode_time(self.now());
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let advanced = tx.execute(
            "UPDATE timers
             SET seconds = CASE WHEN seconds < ?2 THEN seconds + 1 ELSE seconds END,
                 last_updated = MAX(?1, created_at)
             WHERE is_running = 1",
            params![now, i64::MAX],
        )?;
        tx.commit()?;

        Ok(advanced)
    }

    fn count_sync(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM timers", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn find_in(conn: &Connection, column: &str, value: &str) -> Result<Option<TimerRecord>> {
    let query = format!("{SELECT_COLUMNS} WHERE {column} = ?1");
    let record = conn
        .query_row(&query, params![value], row_to_record)
        .optional()?;
    Ok(record)
}

fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encode_seconds(seconds: u64) -> Result<i64> {
    i64::try_from(seconds).map_err(|_| TimerError::validation("seconds", "out of range"))
}

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn parse_time(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TimerRecord> {
    let id: String = row.get(0)?;
    let seconds: i64 = row.get(3)?;
    let created_at: String = row.get(5)?;
    let last_updated: String = row.get(6)?;

    Ok(TimerRecord {
        id: uuid::Uuid::parse_str(&id)
            .map(TimerId::from)
            .map_err(|e| conversion_error(0, Type::Text, e))?,
        pseudo: row.get(1)?,
        description: row.get(2)?,
        seconds: u64::try_from(seconds).map_err(|e| conversion_error(3, Type::Integer, e))?,
        is_running: row.get(4)?,
        created_at: parse_time(5, &created_at)?,
        last_updated: parse_time(6, &last_updated)?,
    })
}

fn map_unique_violation(err: rusqlite::Error, pseudo: &str) -> TimerError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            TimerError::duplicate(pseudo)
        }
        _ => err.into(),
    }
}

#[async_trait]
impl TimerStore for SqliteTimerStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn create(&self, new_timer: NewTimer) -> Result<TimerRecord> {
        self.create_sync(new_timer)
    }

    async fn list(&self, key: SortKey, limit: i64) -> Result<Vec<TimerRecord>> {
        self.list_sync(key, limit)
    }

    async fn get_by_pseudo(&self, pseudo: &str) -> Result<TimerRecord> {
        self.find_sync("pseudo", pseudo)?
            .ok_or_else(|| TimerError::not_found(pseudo))
    }

    async fn get_by_id(&self, id: &TimerId) -> Result<TimerRecord> {
        self.find_sync("id", &id.to_string())?
            .ok_or_else(|| TimerError::not_found(id.to_string()))
    }

    async fn update(&self, id: &TimerId, patch: TimerPatch) -> Result<TimerRecord> {
        self.update_sync(id, &patch)
    }

    async fn delete(&self, id: &TimerId) -> Result<TimerRecord> {
        self.delete_sync(id)
    }

    async fn tick(&self) -> Result<usize> {
        self.tick_sync()
    }

    async fn count(&self) -> Result<usize> {
        self.count_sync()
    }
}
