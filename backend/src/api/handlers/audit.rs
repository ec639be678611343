//! Audit trail handlers.

use axum::{
    extract::{Extension, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi};

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::audit_log::AuditEntry;
use crate::models::role::Role;
use crate::services::permission_service::require_role;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Create audit routes
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(list_audit_entries))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Only entries for this model
    pub model: Option<String>,
    /// Maximum number of entries (default 100, capped at 1000)
    pub limit: Option<usize>,
}

/// Recent audit entries, newest first
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/audit",
    tag = "audit",
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit entries", body = Vec<AuditEntry>),
        (status = 403, description = "Admin role required", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_audit_entries(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>> {
    require_role(&auth.principal(), Role::Admin)?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let entries = match &query.model {
        Some(model) => state.audit_service.for_model(model, limit).await,
        None => state.audit_service.recent(limit).await,
    };
    Ok(Json(entries))
}

#[derive(OpenApi)]
#[openapi(paths(list_audit_entries), components(schemas(AuditEntry)))]
pub struct AuditApiDoc;
