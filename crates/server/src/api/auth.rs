//! Registration and login.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_storage::StoreError;
use tracing::info;

use crate::identity::{hash_password, verify_password};
use crate::state::AppState;

use super::{ApiError, ErrorResponse, api_error, store_error};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub login: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Create an account.
#[utoipa::path(
    post,
    path = "/api/v1/register",
    tag = "Auth",
    request_body = Credentials,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Empty login or password", body = ErrorResponse),
        (status = 409, description = "Login already taken", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Credentials>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let login = req.login.trim();
    if login.is_empty() || req.password.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "login and password are required"));
    }

    let password = req.password;
    let cost = state.password_cost;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let user = state
        .users
        .create_user(login, &password_hash)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => api_error(StatusCode::CONFLICT, "login already taken"),
            other => store_error(other),
        })?;

    info!(user_id = %user.id, "Registered user {}", user.login);
    Ok((StatusCode::CREATED, Json(UserResponse { id: user.id.0, login: user.login })))
}

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    tag = "Auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let unauthorized = || api_error(StatusCode::UNAUTHORIZED, "invalid login or password");
    let user = state
        .users
        .find_user(req.login.trim())
        .await
        .map_err(store_error)?
        .ok_or_else(unauthorized)?;

    let password = req.password;
    let stored = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !verified {
        return Err(unauthorized());
    }

    let token = state
        .identity
        .issue(user.id)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(LoginResponse { token, user: UserResponse { id: user.id.0, login: user.login } }))
}
