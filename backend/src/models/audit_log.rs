//! Audit log and model version history models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::model_definition::ModelDefinition;

/// One recorded change.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Event type, e.g. "record.updated"
    pub action: String,
    /// Model the change belongs to, if any
    pub model: Option<String>,
    pub entity_id: String,
    /// Id of the user who made the change
    pub actor: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub before: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub after: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

/// Snapshot of one saved version of a model definition.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModelVersion {
    pub model: String,
    pub version: u32,
    pub definition: ModelDefinition,
    pub changed_by: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
