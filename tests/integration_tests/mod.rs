//! Integration tests module
//!
//! End-to-end tests for the timer service:
//! - HTTP API against every store backend
//! - Persistence across reopen
//! - Tick scheduler timing and shutdown

pub mod api_test;
pub mod persistence_test;
