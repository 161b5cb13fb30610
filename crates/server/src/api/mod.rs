//! Domain-focused API endpoint modules.
//!
//! Shared error mapping and the bearer-token extractor live here.

pub mod auth;
pub mod doc;
pub mod expressions;
pub mod health;
pub mod tasks;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::Json;
use serde::Serialize;
use tally_compute::EngineError;
use tally_core::OwnerId;
use tally_storage::StoreError;
use tracing::error;

use crate::state::AppState;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

pub(crate) fn engine_error(e: EngineError) -> ApiError {
    let status = match &e {
        EngineError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::TaskNotFound(_) | EngineError::ExpressionNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::DuplicateResult(_) | EngineError::AlreadyExists(_) => StatusCode::CONFLICT,
        EngineError::InternalFault(_) => {
            error!("engine fault: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e.to_string())
}

pub(crate) fn store_error(e: StoreError) -> ApiError {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    api_error(status, e.to_string())
}

// ── Authentication ───────────────────────────────────────────────

/// Owner resolved from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthOwner(pub OwnerId);

impl FromRequestParts<Arc<AppState>> for AuthOwner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

        state
            .identity
            .resolve(token)
            .map(AuthOwner)
            .map_err(|e| api_error(StatusCode::UNAUTHORIZED, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tally_compute::ParseError;
    use tally_core::TaskId;

    use super::*;

    #[test]
    fn engine_errors_map_to_statuses() {
        assert_eq!(engine_error(EngineError::Parse(ParseError::Empty)).0, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(engine_error(EngineError::TaskNotFound(TaskId(1))).0, StatusCode::NOT_FOUND);
        assert_eq!(engine_error(EngineError::DuplicateResult(TaskId(1))).0, StatusCode::CONFLICT);
        assert_eq!(
            engine_error(EngineError::InternalFault("x".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_map_to_statuses() {
        assert_eq!(store_error(StoreError::Duplicate("x".into())).0, StatusCode::CONFLICT);
        assert_eq!(store_error(StoreError::Other("x".into())).0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
