//! REST API handlers for the timer server
//!
//! Request bodies are read as loose JSON values and validated field by field,
//! so a wrong type or a malformed body comes back as a 400 with a readable
//! message rather than an extractor rejection.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorCategory, Result, TimerError};
use crate::metrics;
use crate::models::{NewTimer, SortKey, TimerId, TimerPatch, TimerRecord, DEFAULT_LIST_LIMIT};

use super::health::health_check;
use super::server::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Error body: `{"error": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Body returned by a successful delete
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub timer: TimerRecord,
}

/// Store error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub TimerError);

impl From<TimerError> for ApiError {
    fn from(err: TimerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0.category() {
            ErrorCategory::Conflict => (
                StatusCode::BAD_REQUEST,
                "Timer with this username already exists".to_string(),
            ),
            ErrorCategory::NotFound => (StatusCode::NOT_FOUND, "Timer not found".to_string()),
            ErrorCategory::Validation => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ErrorCategory::Storage => {
                tracing::error!(error = ?self.0, "Timer store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Query string for list requests
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub sort: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    /// Resolve to a sort key and limit, applying defaults
    pub fn resolve(&self) -> Result<(SortKey, i64)> {
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => SortKey::default(),
            Some(s) => s.parse()?,
        };
        let limit = match self.limit.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_LIST_LIMIT,
            Some(s) => s
                .parse::<i64>()
                .map_err(|_| TimerError::validation("limit", "must be an integer"))?,
        };
        Ok((sort, limit))
    }
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/timers", get(list_timers).post(create_timer))
        .route("/api/timers/recent", get(recent_timers))
        .route("/api/timers/id/{id}", get(get_timer_by_id))
        .route(
            "/api/timers/{key}",
            get(get_timer_by_pseudo).put(update_timer).delete(delete_timer),
        )
        .with_state(state)
}

// ============================================================================
// Body Validation
// ============================================================================

fn body_object(body: std::result::Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>> {
    let Json(value) = body.map_err(|e| TimerError::validation("body", e.body_text()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(TimerError::validation("body", "must be a JSON object")),
    }
}

/// Field value, treating an explicit `null` as absent
fn field<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.get(name).filter(|v| !v.is_null())
}

fn optional_string(map: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match field(map, name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(TimerError::validation(name, "must be a string")),
    }
}

/// Parse a create body: `{pseudo, description?}`
pub fn parse_new_timer(map: &Map<String, Value>) -> Result<NewTimer> {
    let pseudo = match field(map, "pseudo") {
        None => return Err(TimerError::validation("pseudo", "is required")),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(TimerError::validation("pseudo", "must be a string")),
    };

    let new_timer = NewTimer {
        pseudo,
        description: optional_string(map, "description")?,
    };
    new_timer.validate()?;
    Ok(new_timer)
}

/// Parse an update body: `{seconds?, isRunning?, description?}`
///
/// `seconds` may be a JSON integer or a string holding one.
pub fn parse_patch(map: &Map<String, Value>) -> Result<TimerPatch> {
    let invalid_seconds = || TimerError::validation("seconds", "must be a non-negative integer");

    let seconds = match field(map, "seconds") {
        None => None,
        Some(Value::Number(n)) => Some(n.as_i64().ok_or_else(invalid_seconds)?),
        Some(Value::String(s)) => Some(s.trim().parse::<i64>().map_err(|_| invalid_seconds())?),
        Some(_) => return Err(invalid_seconds()),
    };

    let is_running = match field(map, "isRunning") {
        None => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => return Err(TimerError::validation("isRunning", "must be a boolean")),
    };

    let patch = TimerPatch {
        seconds,
        is_running,
        description: optional_string(map, "description")?,
    };
    patch.validate()?;
    Ok(patch)
}

// ============================================================================
// Timer Handlers
// ============================================================================

async fn refresh_timer_gauge(state: &AppState) {
    if let Ok(count) = state.store.count().await {
        metrics::set_timer_count(count);
    }
}

/// Create a timer
async fn create_timer(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TimerRecord>)> {
    let result = match body_object(body).and_then(|map| parse_new_timer(&map)) {
        Ok(new_timer) => state.store.create(new_timer).await,
        Err(e) => Err(e),
    };
    metrics::record_operation("create", &result);

    let record = result?;
    refresh_timer_gauge(&state).await;
    tracing::info!(id = %record.id, pseudo = %record.pseudo, "Timer created");

    Ok((StatusCode::CREATED, Json(record)))
}

/// List timers by `sort`, at most `limit`
async fn list_timers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<TimerRecord>>> {
    let (sort, limit) = params.resolve()?;
    let result = state.store.list(sort, limit).await;
    metrics::record_operation("list", &result);
    Ok(Json(result?))
}

/// The five most recently updated timers
async fn recent_timers(State(state): State<AppState>) -> ApiResult<Json<Vec<TimerRecord>>> {
    let result = state.store.recent().await;
    metrics::record_operation("recent", &result);
    Ok(Json(result?))
}

async fn get_timer_by_pseudo(
    State(state): State<AppState>,
    Path(pseudo): Path<String>,
) -> ApiResult<Json<TimerRecord>> {
    let result = state.store.get_by_pseudo(&pseudo).await;
    metrics::record_operation("get_by_pseudo", &result);
    Ok(Json(result?))
}

async fn get_timer_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TimerRecord>> {
    let result = match id.parse::<TimerId>() {
        Ok(id) => state.store.get_by_id(&id).await,
        Err(e) => Err(e),
    };
    metrics::record_operation("get_by_id", &result);
    Ok(Json(result?))
}

/// Apply a partial update
async fn update_timer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<TimerRecord>> {
    // A malformed id is reported before the body; the store checks existence
    let result = match id.parse::<TimerId>() {
        Ok(id) => match body_object(body).and_then(|map| parse_patch(&map)) {
            Ok(patch) => state.store.update(&id, patch).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };
    metrics::record_operation("update", &result);

    let record = result?;
    tracing::debug!(id = %record.id, seconds = record.seconds, running = record.is_running, "Timer updated");
    Ok(Json(record))
}

async fn delete_timer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let result = match id.parse::<TimerId>() {
        Ok(id) => state.store.delete(&id).await,
        Err(e) => Err(e),
    };
    metrics::record_operation("delete", &result);

    let timer = result?;
    refresh_timer_gauge(&state).await;
    tracing::info!(id = %timer.id, pseudo = %timer.pseudo, "Timer deleted");

    Ok(Json(DeleteResponse {
        message: "Timer deleted successfully".to_string(),
        timer,
    }))
}

// ============================================================================
// Metrics Handler
// ============================================================================

async fn metrics_endpoint() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
