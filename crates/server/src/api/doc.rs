//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 document, served via Scalar UI at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "tally API",
        version = "0.1.0",
        description = "Distributed arithmetic: expressions are split into operations that remote workers pull and answer.",
    ),
    tags(
        (name = "Health", description = "Liveness and engine metrics"),
        (name = "Auth", description = "Registration and bearer-token login"),
        (name = "Expressions", description = "Submit expressions and inspect their status"),
        (name = "Workers", description = "Task pull and result delivery for computing agents"),
    ),
    paths(
        crate::api::health::health,
        crate::api::health::engine_metrics,
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::expressions::calculate,
        crate::api::expressions::list_expressions,
        crate::api::expressions::get_expression,
        crate::api::tasks::pull_task,
        crate::api::tasks::submit_result,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::health::HealthResponse,
        crate::api::auth::Credentials,
        crate::api::auth::UserResponse,
        crate::api::auth::LoginResponse,
        crate::api::expressions::CalculateRequest,
        crate::api::expressions::CalculateResponse,
        crate::api::expressions::ExpressionView,
        crate::api::expressions::ExpressionListResponse,
        crate::api::expressions::ExpressionResponse,
        crate::api::tasks::AckResponse,
    )),
    modifiers(&BearerAuth),
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
