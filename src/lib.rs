//! chronometer - Pseudo-keyed elapsed-time counters
//!
//! Each timer counts seconds while it is running. A background tick advances
//! every running timer once per second, and a small REST API creates, lists,
//! updates and deletes timers.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`storage`] - The `TimerStore` trait and its memory, JSON file and SQLite backends
//! - [`ticker`] - Periodic tick scheduler
//! - [`server`] - HTTP handlers and server lifecycle
//! - [`metrics`] - Prometheus metrics
//!
//! # Example
//!
//! ```no_run
//! use chronometer::clock::system_clock;
//! use chronometer::config::Config;
//! use chronometer::storage::open_store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = open_store(&config.storage, system_clock())?;
//!     println!("{} timers", store.count().await?);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod server;
pub mod storage;
pub mod ticker;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{system_clock, SharedClock};
    pub use crate::config::Config;
    pub use crate::error::{ErrorCategory, Result, TimerError};
    pub use crate::models::{NewTimer, SortKey, TimerId, TimerPatch, TimerRecord};
    pub use crate::storage::{open_store, SharedTimerStore, TimerStore};
    pub use crate::ticker::{TickScheduler, TickerHandle};
}

// Direct re-exports for convenience
pub use models::{NewTimer, SortKey, TimerId, TimerPatch, TimerRecord};
