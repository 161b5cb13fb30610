//! Liveness and engine metrics.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tally_compute::EngineMetrics;

use crate::state::AppState;

use super::{ApiError, ErrorResponse, engine_error};

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

/// Scheduler counters, queue depth and per-operator latency.
#[utoipa::path(
    get,
    path = "/internal/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Engine metrics snapshot", body = Object),
        (status = 500, description = "Engine unavailable", body = ErrorResponse)
    )
)]
pub async fn engine_metrics(State(state): State<Arc<AppState>>) -> Result<Json<EngineMetrics>, ApiError> {
    state.engine.metrics().map(Json).map_err(engine_error)
}
