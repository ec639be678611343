//! User management handlers.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::role::Role;
use crate::models::user::User;
use crate::services::user_service::CreateUserRequest;

/// Create user routes
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(list_users).post(create_user))
}

/// User as returned by the API (never includes the password hash)
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// List users
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 403, description = "Admin role required", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<Vec<UserResponse>>> {
    let users = state.user_service.list(&auth.principal()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Create a user
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid username or password", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::api::openapi::ErrorResponse),
        (status = 409, description = "Username taken", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = state.user_service.create(&auth.principal(), payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[derive(OpenApi)]
#[openapi(
    paths(list_users, create_user),
    components(schemas(UserResponse, CreateUserRequest))
)]
pub struct UsersApiDoc;
