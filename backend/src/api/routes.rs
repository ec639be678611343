//! Route definitions for the API.

use axum::{middleware, routing::get, Json, Router};

use super::handlers;
use super::middleware::auth::auth_middleware;
use super::middleware::security_headers::security_headers_middleware;
use super::middleware::tracing::correlation_id_middleware;
use super::SharedState;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    // Build the OpenAPI document once at startup
    let openapi = super::openapi::build_openapi();

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/openapi.json",
            get(move || {
                let doc = openapi.clone();
                async move { Json(doc) }
            }),
        )
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(correlation_id_middleware))
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: SharedState) -> Router<SharedState> {
    let protected = Router::new()
        .nest("/auth", handlers::auth::protected_router())
        .nest("/users", handlers::users::router())
        .nest("/models", handlers::models::router())
        .nest("/data", handlers::records::router())
        .nest("/audit", handlers::audit::router())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/auth", handlers::auth::public_router())
        .merge(protected)
}
