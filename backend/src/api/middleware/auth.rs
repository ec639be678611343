//! Authentication middleware.
//!
//! Validates `Authorization: Bearer <jwt>` and stores the caller as an
//! [`AuthExtension`] request extension. Role checks happen later, in the
//! services, against the principal derived from it.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::SharedState;
use crate::error::AppError;
use crate::models::role::Role;
use crate::models::user::Principal;
use crate::services::auth_service::Claims;

/// Extension that holds authenticated user information
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl AuthExtension {
    pub fn principal(&self) -> Principal {
        Principal::new(self.user_id.clone(), self.role)
    }
}

impl From<Claims> for AuthExtension {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Token extraction result
#[derive(Debug, PartialEq)]
enum ExtractedToken<'a> {
    Bearer(&'a str),
    None,
    Invalid,
}

fn extract_token(request: &Request) -> ExtractedToken<'_> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return ExtractedToken::None;
    };
    match header.to_str().ok().and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.trim().is_empty() => ExtractedToken::Bearer(token.trim()),
        _ => ExtractedToken::Invalid,
    }
}

/// Authentication middleware function - requires a valid access token
pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_token(&request) {
        ExtractedToken::Bearer(token) => token,
        ExtractedToken::None => {
            return AppError::Authentication("Missing authorization header".into())
                .into_response()
        }
        ExtractedToken::Invalid => {
            return AppError::Authentication("Invalid authorization header format".into())
                .into_response()
        }
    };

    match state.auth_service.validate_access_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthExtension::from(claims));
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected access token");
            AppError::Authentication("Invalid or expired token".into()).into_response()
        }
    }
}
