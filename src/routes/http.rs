// GET handlers: version, names, metric series

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use super::AppState;
use crate::models::{Interval, IntervalError, Results};
use crate::store::StoreError;
use crate::version::{NAME, VERSION};

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/names: every metric name the store has seen.
pub(super) async fn names_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.store.names().await?))
}

/// Interval bounds in Unix seconds. Missing `end` is now; missing `start` is
/// `end - query.default_window_secs`.
#[derive(Debug, Deserialize)]
pub(super) struct RangeParams {
    start: Option<i64>,
    end: Option<i64>,
}

/// GET /api/metrics/{name}: averaged series for one metric over the requested range.
pub(super) async fn metric_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Results>, ApiError> {
    let end = params.end.unwrap_or_else(|| Utc::now().timestamp());
    let window = i64::try_from(state.config.query.default_window_secs).unwrap_or(i64::MAX);
    let start = params.start.unwrap_or_else(|| end.saturating_sub(window));
    let interval = Interval::from_unix(start, end)?;
    Ok(Json(state.store.read(&name, interval).await?))
}

#[derive(Debug)]
pub(super) enum ApiError {
    BadRequest(IntervalError),
    Store(StoreError),
}

impl From<IntervalError> for ApiError {
    fn from(e: IntervalError) -> Self {
        ApiError::BadRequest(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Store(e) => {
                tracing::warn!(error = %e, operation = "read", "store query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
