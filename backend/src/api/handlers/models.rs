//! Model definition handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi};

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::audit_log::ModelVersion;
use crate::models::model_definition::{
    FieldType, FieldValidation, ModelDefinition, ModelDefinitionInput, ModelField,
};
use crate::models::role::{PermissionRule, Role};
use crate::services::permission_service::require_role;

/// Create model definition routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_models).post(create_model))
        .route("/:name", get(get_model).put(update_model).delete(delete_model))
        .route("/:name/versions", get(list_model_versions))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DeleteModelQuery {
    /// Also delete every record of the model
    #[serde(default)]
    pub purge: bool,
}

/// List model definitions
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/models",
    tag = "models",
    responses(
        (status = 200, description = "All model definitions", body = Vec<ModelDefinition>),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_models(State(state): State<SharedState>) -> Result<Json<Vec<ModelDefinition>>> {
    Ok(Json(state.model_service.list().await?))
}

/// Get a model definition
#[utoipa::path(
    get,
    path = "/{name}",
    context_path = "/api/v1/models",
    tag = "models",
    params(("name" = String, Path, description = "Model name")),
    responses(
        (status = 200, description = "Model definition", body = ModelDefinition),
        (status = 404, description = "Unknown model", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_model(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<ModelDefinition>> {
    Ok(Json(state.model_service.get(&name).await?))
}

/// Create a model definition
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/models",
    tag = "models",
    request_body = ModelDefinitionInput,
    responses(
        (status = 201, description = "Model created", body = ModelDefinition),
        (status = 400, description = "Inconsistent definition", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::api::openapi::ErrorResponse),
        (status = 409, description = "Model name taken", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_model(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<ModelDefinitionInput>,
) -> Result<(StatusCode, Json<ModelDefinition>)> {
    let model = state
        .model_service
        .create(&auth.principal(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(model)))
}

/// Replace a model definition
#[utoipa::path(
    put,
    path = "/{name}",
    context_path = "/api/v1/models",
    tag = "models",
    params(("name" = String, Path, description = "Model name")),
    request_body = ModelDefinitionInput,
    responses(
        (status = 200, description = "Model updated", body = ModelDefinition),
        (status = 400, description = "Inconsistent definition or rename attempt", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Unknown model", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_model(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(name): Path<String>,
    Json(payload): Json<ModelDefinitionInput>,
) -> Result<Json<ModelDefinition>> {
    let model = state
        .model_service
        .update(&auth.principal(), &name, payload)
        .await?;
    Ok(Json(model))
}

/// Delete a model definition
#[utoipa::path(
    delete,
    path = "/{name}",
    context_path = "/api/v1/models",
    tag = "models",
    params(
        ("name" = String, Path, description = "Model name"),
        DeleteModelQuery,
    ),
    responses(
        (status = 204, description = "Model deleted"),
        (status = 403, description = "Admin role required", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Unknown model", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_model(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(name): Path<String>,
    Query(query): Query<DeleteModelQuery>,
) -> Result<StatusCode> {
    state
        .model_service
        .delete(&auth.principal(), &name, query.purge)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Version history of a model definition, oldest first
#[utoipa::path(
    get,
    path = "/{name}/versions",
    context_path = "/api/v1/models",
    tag = "models",
    params(("name" = String, Path, description = "Model name")),
    responses(
        (status = 200, description = "Saved versions", body = Vec<ModelVersion>),
        (status = 403, description = "Admin role required", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_model_versions(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(name): Path<String>,
) -> Result<Json<Vec<ModelVersion>>> {
    require_role(&auth.principal(), Role::Admin)?;
    Ok(Json(state.audit_service.versions(&name).await))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_models,
        get_model,
        create_model,
        update_model,
        delete_model,
        list_model_versions,
    ),
    components(schemas(
        ModelDefinition,
        ModelDefinitionInput,
        ModelField,
        FieldType,
        FieldValidation,
        PermissionRule,
        Role,
        ModelVersion,
    ))
)]
pub struct ModelsApiDoc;
