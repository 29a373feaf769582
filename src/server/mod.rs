//! HTTP server for timers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │            Timer Server             │
//! │                                     │
//! │  ┌──────────────────────────────┐  │
//! │  │         REST API             │  │
//! │  │  GET    /api/health          │  │
//! │  │  GET    /api/timers          │  │
//! │  │  POST   /api/timers          │  │
//! │  │  GET    /api/timers/recent   │  │
//! │  │  GET    /api/timers/{pseudo} │  │
//! │  │  GET    /api/timers/id/{id}  │  │
//! │  │  PUT    /api/timers/{id}     │  │
//! │  │  DELETE /api/timers/{id}     │  │
//! │  │  GET    /metrics             │  │
//! │  └──────────────────────────────┘  │
//! │                                     │
//! │  ┌──────────────────────────────┐  │
//! │  │       Tick Scheduler         │  │
//! │  └──────────────────────────────┘  │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use chronometer::server::{ServerConfig, TimerServer};
//!
//! let server = TimerServer::new(ServerConfig::default(), store, Duration::from_secs(1))?;
//! server.start_with_shutdown(shutdown_signal()).await?;
//! ```

pub mod api;
pub mod config;
pub mod health;
#[allow(clippy::module_inception)]
pub mod server;

// Re-export main types
pub use config::ServerConfig;
pub use server::{AppState, ServerError, ServerInfo, TimerServer};
