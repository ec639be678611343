//! Authentication handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::role::Role;
use crate::services::auth_service::TokenPair;

/// Create public auth routes (no auth required)
pub fn public_router() -> Router<SharedState> {
    Router::new().route("/login", post(login))
}

/// Create protected auth routes (auth required)
pub fn protected_router() -> Router<SharedState> {
    Router::new().route("/me", get(get_current_user))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
}

/// Login with credentials
#[utoipa::path(
    post,
    path = "/login",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token issued", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = crate::api::openapi::ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>> {
    let (_, tokens) = state
        .auth_service
        .authenticate(&payload.username, &payload.password)
        .await?;
    Ok(Json(tokens))
}

/// Get the authenticated caller
#[utoipa::path(
    get,
    path = "/me",
    context_path = "/api/v1/auth",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = CurrentUserResponse),
        (status = 401, description = "Missing or invalid token", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    Extension(auth): Extension<AuthExtension>,
) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        id: auth.user_id,
        username: auth.username,
        role: auth.role,
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(login, get_current_user),
    components(schemas(LoginRequest, CurrentUserResponse, TokenPair))
)]
pub struct AuthApiDoc;
