//! OpenAPI specification generated from handler annotations via utoipa.

use std::collections::BTreeMap;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

/// Top-level OpenAPI document.
///
/// Each handler module contributes its own paths and schemas via a
/// per-module `#[derive(OpenApi)]` struct merged in [`build_openapi`].
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Formwork API",
        description = "Schema-driven CRUD with role and ownership based access control.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login and current principal"),
        (name = "users", description = "User management"),
        (name = "models", description = "Model definitions and their version history"),
        (name = "records", description = "Records of user-defined models"),
        (name = "audit", description = "Audit trail"),
        (name = "health", description = "Health checks"),
    ),
    components(schemas(ErrorResponse))
)]
pub struct ApiDoc;

/// Standard error response body returned by all endpoints on failure.
#[derive(serde::Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "NOT_FOUND", "VALIDATION_ERROR")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Field name to message, present only for record validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

/// Adds Bearer JWT security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
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

/// Build the merged OpenAPI document from all handler modules.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    doc.merge(super::handlers::health::HealthApiDoc::openapi());
    doc.merge(super::handlers::auth::AuthApiDoc::openapi());
    doc.merge(super::handlers::users::UsersApiDoc::openapi());
    doc.merge(super::handlers::models::ModelsApiDoc::openapi());
    doc.merge(super::handlers::records::RecordsApiDoc::openapi());
    doc.merge(super::handlers::audit::AuditApiDoc::openapi());

    doc
}
