//! Common test utilities

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use chronometer::clock::{ManualClock, SharedClock};
use chronometer::server::{ServerConfig, TimerServer};
use chronometer::storage::{FileTimerStore, MemoryTimerStore, SharedTimerStore, SqliteTimerStore};

/// Fixed start instant for manual clocks
#[allow(dead_code)]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A manual clock starting at [`epoch`]
#[allow(dead_code)]
pub fn manual_clock() -> Arc<ManualClock> {
    ManualClock::shared(epoch())
}

/// One store per backend, sharing `clock`
///
/// The returned directory holds the file and SQLite data and must outlive
/// the stores.
pub fn all_backends(clock: SharedClock) -> (Vec<SharedTimerStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let stores: Vec<SharedTimerStore> = vec![
        Arc::new(MemoryTimerStore::new(clock.clone())),
        Arc::new(FileTimerStore::open(dir.path().join("timers.json"), clock.clone()).unwrap()),
        Arc::new(SqliteTimerStore::open(dir.path().join("timers.db"), clock).unwrap()),
    ];
    (stores, dir)
}

/// Router over `store` with default settings
#[allow(dead_code)]
pub fn test_app(store: SharedTimerStore) -> Router {
    let config = ServerConfig::builder()
        .enable_request_logging(false)
        .build()
        .unwrap();
    TimerServer::new(config, store, Duration::from_secs(1))
        .unwrap()
        .build_router()
}

/// Send one request and decode the JSON response body
#[allow(dead_code)]
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send_request(app, request).await
}

/// Send a prepared request and decode the JSON response body
#[allow(dead_code)]
pub async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
