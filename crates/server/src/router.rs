//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .route("/health", get(api::health::health))
        .route("/api/v1/register", post(api::auth::register))
        .route("/api/v1/login", post(api::auth::login))
        .route("/api/v1/calculate", post(api::expressions::calculate))
        .route("/api/v1/expressions", get(api::expressions::list_expressions))
        .route("/api/v1/expressions/{id}", get(api::expressions::get_expression))
        .route(
            "/internal/task",
            get(api::tasks::pull_task).post(api::tasks::submit_result),
        )
        .route("/internal/metrics", get(api::health::engine_metrics))
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::permissive().allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS_ORIGIN '{}', allowing any origin", origin);
            CorsLayer::permissive()
        }
    }
}
