//! Wall clock injection
//!
//! Stores stamp `createdAt`/`lastUpdated` through a [`SharedClock`] so tests
//! can pin or step time instead of sleeping.

use chrono::{DateTime, Duration, Local, Utc};
use mockable::{Clock, DefaultClock};
use std::sync::{Arc, Mutex};

/// Clock handle shared between a store and its callers
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// The real system clock
pub fn system_clock() -> SharedClock {
    Arc::new(DefaultClock)
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    /// Shared handle starting at `start`
    pub fn shared(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self::new(start))
    }

    pub fn advance_seconds(&self, seconds: i64) {
        let mut now = self.lock();
        *now += Duration::seconds(seconds);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.lock() = at;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // The guarded value is a plain timestamp; a poisoned lock still holds a valid one.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
