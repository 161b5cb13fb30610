//! Owner-facing expression endpoints: submit, list, inspect.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_compute::{EngineError, Submission};
use tally_core::{ExpressionId, ExpressionRecord};
use tracing::info;

use crate::state::AppState;

use super::{ApiError, AuthOwner, ErrorResponse, api_error, engine_error, store_error};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CalculateRequest {
    pub expression: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CalculateResponse {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ExpressionView {
    pub id: i64,
    pub expression: String,
    /// `pending`, `completed` or `error`.
    pub status: String,
    pub result: Option<f64>,
}

impl From<ExpressionRecord> for ExpressionView {
    fn from(record: ExpressionRecord) -> Self {
        Self {
            id: record.id.0,
            expression: record.expression,
            status: record.status.to_string(),
            result: record.result,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExpressionListResponse {
    pub expressions: Vec<ExpressionView>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExpressionResponse {
    pub expression: ExpressionView,
}

/// Submit an expression for distributed evaluation.
///
/// A malformed expression is still persisted, with status `error`.
#[utoipa::path(
    post,
    path = "/api/v1/calculate",
    tag = "Expressions",
    request_body = CalculateRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Expression accepted", body = CalculateResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 422, description = "Expression could not be parsed", body = ErrorResponse)
    )
)]
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    AuthOwner(owner): AuthOwner,
    Json(req): Json<CalculateRequest>,
) -> Result<(StatusCode, Json<CalculateResponse>), ApiError> {
    let record = state
        .expressions
        .create_expression(owner, &req.expression)
        .await
        .map_err(store_error)?;

    match state.engine.submit(record.id, owner, &req.expression) {
        Ok(Submission::Scheduled { tasks_emitted, .. }) => {
            info!(expression_id = %record.id, owner = %owner, tasks_emitted, "Accepted expression");
        }
        Ok(Submission::Completed(done)) => {
            state.persist_terminal(&done).await.map_err(store_error)?;
        }
        Err(EngineError::Parse(e)) => {
            state.persist_terminal(&record.failed()).await.map_err(store_error)?;
            return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
        }
        Err(other) => return Err(engine_error(other)),
    }

    Ok((StatusCode::CREATED, Json(CalculateResponse { id: record.id.0 })))
}

/// List the caller's expressions.
#[utoipa::path(
    get,
    path = "/api/v1/expressions",
    tag = "Expressions",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Expressions owned by the caller", body = ExpressionListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn list_expressions(
    State(state): State<Arc<AppState>>,
    AuthOwner(owner): AuthOwner,
) -> Result<Json<ExpressionListResponse>, ApiError> {
    let records = state.expressions.list_expressions(owner).await.map_err(store_error)?;
    Ok(Json(ExpressionListResponse {
        expressions: records.into_iter().map(ExpressionView::from).collect(),
    }))
}

/// Status and result of one expression.
///
/// Live expressions are read from the engine, finished ones from the store.
/// A terminal expression leaves the engine before its store row is updated,
/// so a read in that window, or after the update failed, returns the stored
/// `pending` row.
#[utoipa::path(
    get,
    path = "/api/v1/expressions/{id}",
    tag = "Expressions",
    params(("id" = i64, Path, description = "Expression id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Expression found", body = ExpressionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No such expression for this caller", body = ErrorResponse)
    )
)]
pub async fn get_expression(
    State(state): State<Arc<AppState>>,
    AuthOwner(owner): AuthOwner,
    Path(id): Path<i64>,
) -> Result<Json<ExpressionResponse>, ApiError> {
    let id = ExpressionId(id);
    let record = match state.engine.status(id, owner) {
        Ok(live) => live,
        Err(EngineError::ExpressionNotFound(_)) => {
            state.expressions.get_expression(id, owner).await.map_err(store_error)?
        }
        Err(other) => return Err(engine_error(other)),
    };
    Ok(Json(ExpressionResponse { expression: record.into() }))
}
