//! HTTP API integration tests
//!
//! Drives the full router with `oneshot` requests against each backend.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use chronometer::clock::system_clock;
use chronometer::error::{Result, TimerError};
use chronometer::models::{NewTimer, SortKey, TimerId, TimerPatch, TimerRecord};
use chronometer::server::{ServerConfig, TimerServer};
use chronometer::storage::{MemoryTimerStore, SharedTimerStore, TimerStore};

use crate::common::{all_backends, send, send_request, test_app};

fn memory_app() -> axum::Router {
    let store: SharedTimerStore = Arc::new(MemoryTimerStore::new(system_clock()));
    test_app(store)
}

// ============================================================================
// Create / Read
// ============================================================================

#[tokio::test]
async fn test_create_returns_201_record() {
    let (stores, _dir) = all_backends(system_clock());
    for store in stores {
        let app = test_app(store);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/timers",
            Some(json!({"pseudo": "alice", "description": "morning run"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["pseudo"], "alice");
        assert_eq!(body["description"], "morning run");
        assert_eq!(body["seconds"], 0);
        assert_eq!(body["isRunning"], true);
        assert!(body["id"].is_string());
        assert!(body["createdAt"].is_string());
        assert!(body["lastUpdated"].is_string());
    }
}

#[tokio::test]
async fn test_create_duplicate_is_400() {
    let app = memory_app();
    send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "bob"}))).await;

    let (status, body) =
        send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "bob"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Timer with this username already exists"}));
}

#[tokio::test]
async fn test_create_validation_errors() {
    let app = memory_app();

    for payload in [
        json!({}),
        json!({"pseudo": ""}),
        json!({"pseudo": "x".repeat(51)}),
        json!({"pseudo": 12}),
        json!({"pseudo": "ok", "description": false}),
        json!(["not", "an", "object"]),
    ] {
        let (status, body) = send(&app, Method::POST, "/api/timers", Some(payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = memory_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/timers")
        .header("content-type", "application/json")
        .body(Body::from("{\"pseudo\": "))
        .unwrap();

    let (status, body) = send_request(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid body"));
}

#[tokio::test]
async fn test_get_by_pseudo_and_id() {
    let app = memory_app();
    let (_, created) =
        send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "carol"}))).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(&app, Method::GET, "/api/timers/carol", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);

    let (status, body) = send(&app, Method::GET, &format!("/api/timers/id/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);

    let (status, body) = send(&app, Method::GET, "/api/timers/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Timer not found"}));

    let (status, _) = send(&app, Method::GET, "/api/timers/id/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pseudo_with_encoded_characters() {
    let app = memory_app();
    send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "jean luc"}))).await;

    let (status, body) = send(&app, Method::GET, "/api/timers/jean%20luc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pseudo"], "jean luc");
}

// ============================================================================
// List
// ============================================================================

async fn seed(app: &axum::Router, timers: &[(&str, i64)]) {
    for (pseudo, seconds) in timers {
        let (_, created) =
            send(app, Method::POST, "/api/timers", Some(json!({"pseudo": pseudo}))).await;
        let id = created["id"].as_str().unwrap().to_string();
        send(
            app,
            Method::PUT,
            &format!("/api/timers/{id}"),
            Some(json!({"seconds": seconds, "isRunning": false})),
        )
        .await;
    }
}

fn pseudos(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|r| r["pseudo"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_list_defaults_to_seconds_limit_ten() {
    let app = memory_app();
    let timers: Vec<(String, i64)> = (0..12).map(|i| (format!("user{i}"), i)).collect();
    let refs: Vec<(&str, i64)> = timers.iter().map(|(p, s)| (p.as_str(), *s)).collect();
    seed(&app, &refs).await;

    let (status, body) = send(&app, Method::GET, "/api/timers", None).await;
    assert_eq!(status, StatusCode::OK);

    let names = pseudos(&body);
    assert_eq!(names.len(), 10);
    assert_eq!(names[0], "user11");
    assert_eq!(names[9], "user2");
}

#[tokio::test]
async fn test_list_sort_and_limit_params() {
    let app = memory_app();
    seed(&app, &[("a", 5), ("b", 1), ("c", 9)]).await;

    let (_, body) = send(&app, Method::GET, "/api/timers?sort=seconds&limit=2", None).await;
    assert_eq!(pseudos(&body), vec!["c", "a"]);

    let (_, body) = send(&app, Method::GET, "/api/timers?sort=createdAt", None).await;
    assert_eq!(pseudos(&body).len(), 3);

    let (_, body) = send(&app, Method::GET, "/api/timers?limit=-1", None).await;
    assert_eq!(body, json!([]));

    let (status, _) = send(&app, Method::GET, "/api/timers?sort=name", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/api/timers?limit=many", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recent_returns_at_most_five() {
    let app = memory_app();
    let timers: Vec<(String, i64)> = (0..7).map(|i| (format!("r{i}"), 0)).collect();
    let refs: Vec<(&str, i64)> = timers.iter().map(|(p, s)| (p.as_str(), *s)).collect();
    seed(&app, &refs).await;

    let (status, body) = send(&app, Method::GET, "/api/timers/recent", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);
}

// ============================================================================
// Update / Delete
// ============================================================================

#[tokio::test]
async fn test_update_fields() {
    let (stores, _dir) = all_backends(system_clock());
    for store in stores {
        let app = test_app(store);
        let (_, created) =
            send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "dave"}))).await;
        let uri = format!("/api/timers/{}", created["id"].as_str().unwrap());

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({"seconds": "120", "isRunning": false, "description": "paused"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["seconds"], 120);
        assert_eq!(body["isRunning"], false);
        assert_eq!(body["description"], "paused");

        // Null and absent fields leave values alone
        let (status, body) =
            send(&app, Method::PUT, &uri, Some(json!({"seconds": null, "extra": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["seconds"], 120);
        assert_eq!(body["description"], "paused");
    }
}

#[tokio::test]
async fn test_update_rejects_negative_seconds() {
    let app = memory_app();
    let (_, created) =
        send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "erin"}))).await;
    let uri = format!("/api/timers/{}", created["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"seconds": -1, "isRunning": false})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("seconds"));

    let (_, after) = send(&app, Method::GET, "/api/timers/erin", None).await;
    assert_eq!(after, created);
}

#[tokio::test]
async fn test_update_unknown_id_is_404() {
    let app = memory_app();
    let uri = format!("/api/timers/{}", uuid::Uuid::new_v4());

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"seconds": 3}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Timer not found"}));
}

#[tokio::test]
async fn test_delete_returns_message_and_timer() {
    let app = memory_app();
    let (_, created) =
        send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "frank"}))).await;
    let uri = format!("/api/timers/{}", created["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Timer deleted successfully");
    assert_eq!(body["timer"], created);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/api/timers/frank", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Health / Metrics / CORS
// ============================================================================

#[tokio::test]
async fn test_health_reports_timer_count() {
    let app = memory_app();
    send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "gina"}))).await;

    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["timers"], 1);
    assert_eq!(body["backend"], "memory");
    assert!(body["uptimeSecs"].is_u64());
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() {
    let _ = chronometer::metrics::init_metrics();
    let app = memory_app();
    send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "hank"}))).await;

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("chronometer_timer_operations_total"));
}

#[tokio::test]
async fn test_cors_headers_present() {
    let app = memory_app();
    let request = Request::builder()
        .uri("/api/health")
        .header("origin", "http://example.com")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

// ============================================================================
// Failure paths
// ============================================================================

/// Store whose every operation fails with a storage error
struct BrokenStore;

#[async_trait]
impl TimerStore for BrokenStore {
    fn backend(&self) -> &'static str {
        "broken"
    }

    async fn create(&self, _new_timer: NewTimer) -> Result<TimerRecord> {
        Err(TimerError::storage("disk full"))
    }

    async fn list(&self, _key: SortKey, _limit: i64) -> Result<Vec<TimerRecord>> {
        Err(TimerError::storage("database is locked"))
    }

    async fn get_by_pseudo(&self, _pseudo: &str) -> Result<TimerRecord> {
        Err(TimerError::storage("database is locked"))
    }

    async fn get_by_id(&self, _id: &TimerId) -> Result<TimerRecord> {
        Err(TimerError::storage("database is locked"))
    }

    async fn update(&self, _id: &TimerId, _patch: TimerPatch) -> Result<TimerRecord> {
        Err(TimerError::storage("database is locked"))
    }

    async fn delete(&self, _id: &TimerId) -> Result<TimerRecord> {
        Err(TimerError::storage("database is locked"))
    }

    async fn tick(&self) -> Result<usize> {
        Err(TimerError::storage("database is locked"))
    }

    async fn count(&self) -> Result<usize> {
        Err(TimerError::storage("database is locked"))
    }
}

#[tokio::test]
async fn test_health_unavailable_when_store_fails() {
    let app = test_app(Arc::new(BrokenStore));
    let (status, body) = send(&app, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["backend"], "broken");
    assert!(body.get("timers").is_none());
}

#[tokio::test]
async fn test_storage_failure_hides_details() {
    let app = test_app(Arc::new(BrokenStore));
    let expected = json!({"error": "Internal server error"});

    let (status, body) = send(&app, Method::GET, "/api/timers", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, expected);

    let (status, body) =
        send(&app, Method::POST, "/api/timers", Some(json!({"pseudo": "alice"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, expected);

    let (status, body) = send(&app, Method::GET, "/api/timers/alice", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_update_unknown_id_validates_body_first() {
    let app = memory_app();
    let uri = format!("/api/timers/{}", TimerId::generate());

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"seconds": -1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("seconds"));

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"seconds": 5}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Timer not found"}));
}

// ============================================================================
// Static files
// ============================================================================

#[tokio::test]
async fn test_static_dir_served_as_fallback() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>timers</h1>").unwrap();

    let config = ServerConfig::builder()
        .enable_request_logging(false)
        .static_dir(dir.path().to_string_lossy())
        .build()
        .unwrap();
    let store: SharedTimerStore = Arc::new(MemoryTimerStore::new(system_clock()));
    let app = TimerServer::new(config, store, Duration::from_secs(1))
        .unwrap()
        .build_router();

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>timers</h1>");

    // API routes still take precedence
    let (status, body) = send(&app, Method::GET, "/api/timers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = send(&app, Method::GET, "/missing.css", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
