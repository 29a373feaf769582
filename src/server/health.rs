//! Health check endpoint
//!
//! `GET /api/health` reports uptime and the number of stored timers. A store
//! that cannot answer `count` turns the check unhealthy (503).

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::metrics;

use super::server::AppState;

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_secs: u64,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timers: Option<usize>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, timers) = match state.store.count().await {
        Ok(count) => {
            metrics::set_timer_count(count);
            (HealthStatus::Healthy, Some(count))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the store");
            (HealthStatus::Unhealthy, None)
        }
    };

    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        backend: state.store.backend().to_string(),
        timers,
    };

    (status.status_code(), Json(body))
}
