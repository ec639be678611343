//! Record CRUD handlers for every defined model.
//!
//! Bodies are free-form JSON objects whose shape is given by the model
//! definition, so no static schema is published for them.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use utoipa::OpenApi;

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::record::Record;

/// Create record routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/:model", get(list_records).post(create_record))
        .route(
            "/:model/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
}

/// List the records of a model visible to the caller
#[utoipa::path(
    get,
    path = "/{model}",
    context_path = "/api/v1/data",
    tag = "records",
    params(("model" = String, Path, description = "Model name")),
    responses(
        (status = 200, description = "Visible records"),
        (status = 403, description = "Role may not read this model", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Unknown model", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_records(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(model): Path<String>,
) -> Result<Json<Vec<Record>>> {
    let records = state
        .record_service
        .list(&auth.principal(), &model)
        .await?;
    Ok(Json(records))
}

/// Create a record
#[utoipa::path(
    post,
    path = "/{model}",
    context_path = "/api/v1/data",
    tag = "records",
    params(("model" = String, Path, description = "Model name")),
    responses(
        (status = 201, description = "Record created"),
        (status = 400, description = "Field validation failed", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Role may not create records", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Unknown model", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_record(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(model): Path<String>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Record>)> {
    let record = state
        .record_service
        .create(&auth.principal(), &model, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Get one record
#[utoipa::path(
    get,
    path = "/{model}/{id}",
    context_path = "/api/v1/data",
    tag = "records",
    params(
        ("model" = String, Path, description = "Model name"),
        ("id" = String, Path, description = "Record id"),
    ),
    responses(
        (status = 200, description = "Record"),
        (status = 403, description = "Role or ownership check failed", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Unknown model or record", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_record(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path((model, id)): Path<(String, String)>,
) -> Result<Json<Record>> {
    let record = state
        .record_service
        .get(&auth.principal(), &model, &id)
        .await?;
    Ok(Json(record))
}

/// Partially update a record
#[utoipa::path(
    put,
    path = "/{model}/{id}",
    context_path = "/api/v1/data",
    tag = "records",
    params(
        ("model" = String, Path, description = "Model name"),
        ("id" = String, Path, description = "Record id"),
    ),
    responses(
        (status = 200, description = "Updated record"),
        (status = 400, description = "Field validation failed", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Role or ownership check failed", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Unknown model or record", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_record(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path((model, id)): Path<(String, String)>,
    Json(patch): Json<Map<String, Value>>,
) -> Result<Json<Record>> {
    let record = state
        .record_service
        .update(&auth.principal(), &model, &id, patch)
        .await?;
    Ok(Json(record))
}

/// Delete a record
#[utoipa::path(
    delete,
    path = "/{model}/{id}",
    context_path = "/api/v1/data",
    tag = "records",
    params(
        ("model" = String, Path, description = "Model name"),
        ("id" = String, Path, description = "Record id"),
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 403, description = "Role or ownership check failed", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Unknown model or record", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_record(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path((model, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    state
        .record_service
        .delete(&auth.principal(), &model, &id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(OpenApi)]
#[openapi(paths(list_records, create_record, get_record, update_record, delete_record))]
pub struct RecordsApiDoc;
