//! Core data structures for chronometer
//!
//! A [`TimerRecord`] is a pseudo-keyed counter of elapsed seconds with a
//! running flag. Everything the store accepts from clients arrives as a
//! [`NewTimer`] or a [`TimerPatch`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Result, TimerError};

/// Maximum pseudo length, counted in characters
pub const PSEUDO_MAX_CHARS: usize = 50;

/// Default number of records returned by a list query
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// Number of records returned by the "recent" query
pub const RECENT_LIMIT: i64 = 5;

// ============================================================================
// Timer Identifier
// ============================================================================

/// Opaque timer identifier
///
/// Backed by a random UUID, so an id is never handed out twice even after the
/// record holding it has been deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(Uuid);

impl TimerId {
    /// Allocate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier, returning `None` for anything that is not one
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TimerId {
    type Err = TimerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| TimerError::not_found(s))
    }
}

impl From<Uuid> for TimerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Timer Record
// ============================================================================

/// A single timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    pub id: TimerId,
    pub pseudo: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub seconds: u64,
    pub is_running: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Largest count a timer can hold; ticks stop adding once it is reached
pub const MAX_SECONDS: u64 = i64::MAX as u64;

impl TimerRecord {
    /// Create a running timer at zero seconds
    pub fn new(id: TimerId, new_timer: NewTimer, now: DateTime<Utc>) -> Self {
        Self {
            id,
            pseudo: new_timer.pseudo,
            description: new_timer.description.unwrap_or_default(),
            seconds: 0,
            is_running: true,
            created_at: now,
            last_updated: now,
        }
    }

    /// Refresh `last_updated`, never letting it fall behind `created_at`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now.max(self.created_at);
    }

    /// Advance a running timer by one second
    ///
    /// Returns `true` if the timer was running and has been advanced.
    pub fn advance(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_running {
            return false;
        }
        if self.seconds < MAX_SECONDS {
            self.seconds += 1;
        }
        self.touch(now);
        true
    }

    /// Apply a validated patch and refresh `last_updated`
    pub fn apply(&mut self, patch: &TimerPatch, now: DateTime<Utc>) -> Result<()> {
        let seconds = patch.validated_seconds()?;

        if let Some(seconds) = seconds {
            self.seconds = seconds;
        }
        if let Some(is_running) = patch.is_running {
            self.is_running = is_running;
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        self.touch(now);
        Ok(())
    }

    /// Value of the given sort key, for ordering
    pub fn sort_value(&self, key: SortKey) -> SortValue {
        match key {
            SortKey::Seconds => SortValue::Seconds(self.seconds),
            SortKey::CreatedAt => SortValue::Time(self.created_at),
            SortKey::LastUpdated => SortValue::Time(self.last_updated),
        }
    }
}

/// Comparable projection of a record onto one [`SortKey`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Seconds(u64),
    Time(DateTime<Utc>),
}

// ============================================================================
// Requests
// ============================================================================

/// Input for creating a timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimer {
    pub pseudo: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTimer {
    /// Create a request with no description
    pub fn new(pseudo: impl Into<String>) -> Self {
        Self {
            pseudo: pseudo.into(),
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the pseudo length rule
    pub fn validate(&self) -> Result<()> {
        validate_pseudo(&self.pseudo)
    }
}

/// Partial update of a timer
///
/// `seconds` is signed so a negative client value reaches validation instead
/// of being silently unrepresentable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerPatch {
    #[serde(default)]
    pub seconds: Option<i64>,
    #[serde(default)]
    pub is_running: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TimerPatch {
    pub fn seconds(mut self, seconds: i64) -> Self {
        self.seconds = Some(seconds);
        self
    }

    pub fn running(mut self, is_running: bool) -> Self {
        self.is_running = Some(is_running);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.seconds.is_none() && self.is_running.is_none() && self.description.is_none()
    }

    /// Check every present field
    pub fn validate(&self) -> Result<()> {
        self.validated_seconds().map(|_| ())
    }

    fn validated_seconds(&self) -> Result<Option<u64>> {
        match self.seconds {
            None => Ok(None),
            Some(s) => u64::try_from(s)
                .map(Some)
                .map_err(|_| TimerError::validation("seconds", "must be a non-negative integer")),
        }
    }
}

/// Ordering key for list queries (always descending)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Seconds,
    CreatedAt,
    LastUpdated,
}

impl SortKey {
    /// Wire name of the key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::CreatedAt => "createdAt",
            Self::LastUpdated => "lastUpdated",
        }
    }

    /// Parse a sort key (accepts camelCase and snake_case)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "seconds" => Some(Self::Seconds),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "lastUpdated" | "last_updated" => Some(Self::LastUpdated),
            _ => None,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = TimerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            TimerError::validation("sort", "must be one of seconds, createdAt, lastUpdated")
        })
    }
}

/// Check that a pseudo is between 1 and 50 characters
pub fn validate_pseudo(pseudo: &str) -> Result<()> {
    let len = pseudo.chars().count();
    if len == 0 {
        return Err(TimerError::validation("pseudo", "is required"));
    }
    if len > PSEUDO_MAX_CHARS {
        return Err(TimerError::validation(
            "pseudo",
            format!("must be at most {PSEUDO_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Clamp a requested list limit to a usable count
pub fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit.max(0)).unwrap_or(usize::MAX)
}
