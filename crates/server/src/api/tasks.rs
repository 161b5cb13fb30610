//! Worker-facing endpoints: pull a task, push its result.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tally_compute::ResultOutcome;
use tally_core::{TaskEnvelope, TaskResultSubmission};
use tracing::{debug, warn};

use crate::state::AppState;

use super::{ApiError, ErrorResponse, api_error, engine_error, store_error};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AckResponse {
    pub status: &'static str,
}

/// Hand the oldest pending task to the calling worker.
#[utoipa::path(
    get,
    path = "/internal/task",
    tag = "Workers",
    responses(
        (status = 200, description = "Task leased to the caller", body = Object),
        (status = 404, description = "Nothing pending", body = ErrorResponse)
    )
)]
pub async fn pull_task(State(state): State<Arc<AppState>>) -> Result<Json<TaskEnvelope>, ApiError> {
    match state.engine.pull_task().map_err(engine_error)? {
        Some(task) => Ok(Json(TaskEnvelope { task: task.payload() })),
        None => Err(api_error(StatusCode::NOT_FOUND, "no task available")),
    }
}

/// Deliver the result of a task, or report that it could not be computed.
#[utoipa::path(
    post,
    path = "/internal/task",
    tag = "Workers",
    request_body = Object,
    responses(
        (status = 200, description = "Result applied", body = AckResponse),
        (status = 404, description = "Unknown task", body = ErrorResponse),
        (status = 409, description = "Result already applied", body = ErrorResponse),
        (status = 422, description = "Malformed body", body = ErrorResponse)
    )
)]
pub async fn submit_result(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TaskResultSubmission>, JsonRejection>,
) -> Result<Json<AckResponse>, ApiError> {
    let Json(submission) =
        body.map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.body_text()))?;

    let terminal = match (submission.result, submission.error) {
        (_, Some(reason)) => {
            let record = state.engine.fail_task(submission.id, &reason).map_err(engine_error)?;
            Some(record)
        }
        (Some(value), None) => {
            let outcome = state.engine.submit_result(submission.id, value).map_err(engine_error)?;
            if let ResultOutcome::Progress { expression_id, newly_scheduled } = &outcome {
                debug!(expression_id = %expression_id, task_id = %submission.id, newly_scheduled, "Result applied");
            }
            outcome.terminal().cloned()
        }
        (None, None) => {
            warn!(task_id = %submission.id, "Submission without result or error");
            return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, "either result or error is required"));
        }
    };

    if let Some(record) = terminal {
        state.persist_terminal(&record).await.map_err(store_error)?;
    }
    Ok(Json(AckResponse { status: "result accepted" }))
}
