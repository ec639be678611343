//! Record CRUD with role, ownership and schema enforcement.
//!
//! Every operation follows the same order: load the model definition, check
//! the action against the model's permission rule, check ownership of the
//! target record (single-record operations), validate the payload (writes),
//! then touch the store and publish a change event.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::model_definition::ModelDefinition;
use crate::models::record::{Record, ID_KEY};
use crate::models::role::Action;
use crate::models::user::Principal;
use crate::services::event_bus::{DomainEvent, EventBus, EventKind};
use crate::services::permission_service::{authorize_action, authorize_record, filter_visible};
use crate::services::validation_service::validate_model_data;
use crate::storage::{ModelStore, RecordStore};

/// Record service
pub struct RecordService {
    models: Arc<dyn ModelStore>,
    records: Arc<dyn RecordStore>,
    events: Arc<EventBus>,
}

impl RecordService {
    pub fn new(
        models: Arc<dyn ModelStore>,
        records: Arc<dyn RecordStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            models,
            records,
            events,
        }
    }

    async fn load_model(&self, name: &str) -> Result<ModelDefinition> {
        self.models
            .get(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Model '{}' not found", name)))
    }

    async fn load_record(&self, model: &ModelDefinition, id: &str) -> Result<Record> {
        self.records
            .get(&model.name, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Record '{}' not found", id)))
    }

    /// Records of `model_name` the principal may see.
    pub async fn list(&self, principal: &Principal, model_name: &str) -> Result<Vec<Record>> {
        let model = self.load_model(model_name).await?;
        authorize_action(principal, Action::Read, &model)?;

        let records = self.records.list(&model.name).await?;
        Ok(filter_visible(
            records,
            principal,
            model.owner_field.as_deref(),
        ))
    }

    pub async fn get(&self, principal: &Principal, model_name: &str, id: &str) -> Result<Record> {
        let model = self.load_model(model_name).await?;
        authorize_action(principal, Action::Read, &model)?;

        let record = self.load_record(&model, id).await?;
        authorize_record(principal, &model, &record)?;
        Ok(record)
    }

    /// Create a record. The id is assigned by the store and the owner field,
    /// if the model has one, is set to the principal's id.
    pub async fn create(
        &self,
        principal: &Principal,
        model_name: &str,
        mut payload: Map<String, Value>,
    ) -> Result<Record> {
        let model = self.load_model(model_name).await?;
        authorize_action(principal, Action::Create, &model)?;

        payload.remove(ID_KEY);
        if let Some(owner_field) = &model.owner_field {
            payload.insert(owner_field.clone(), Value::String(principal.id.clone()));
        }

        let errors = validate_model_data(&payload, &model);
        if !errors.is_empty() {
            tracing::debug!(model = %model.name, fields = ?errors.keys().collect::<Vec<_>>(), "Create rejected by validation");
            return Err(AppError::InvalidRecord(errors));
        }

        let record = self.records.create(&model.name, payload).await?;
        tracing::info!(model = %model.name, record_id = %record.id, user_id = %principal.id, "Record created");

        self.events.publish(
            DomainEvent::now(EventKind::RecordCreated, record.id.clone(), Some(principal.id.clone()))
                .model(model.name.clone())
                .after(record.to_value()),
        );
        Ok(record)
    }

    /// Apply a partial update. `id` and the owner field are never writable;
    /// validation runs against the record as it will look after the update.
    pub async fn update(
        &self,
        principal: &Principal,
        model_name: &str,
        id: &str,
        mut patch: Map<String, Value>,
    ) -> Result<Record> {
        let model = self.load_model(model_name).await?;
        authorize_action(principal, Action::Update, &model)?;

        let existing = self.load_record(&model, id).await?;
        authorize_record(principal, &model, &existing)?;

        patch.remove(ID_KEY);
        if let Some(owner_field) = &model.owner_field {
            patch.remove(owner_field);
        }

        let errors = validate_model_data(&existing.merged_with(&patch), &model);
        if !errors.is_empty() {
            tracing::debug!(model = %model.name, record_id = %id, fields = ?errors.keys().collect::<Vec<_>>(), "Update rejected by validation");
            return Err(AppError::InvalidRecord(errors));
        }

        let updated = self
            .records
            .update(&model.name, id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Record '{}' not found", id)))?;
        tracing::info!(model = %model.name, record_id = %id, user_id = %principal.id, "Record updated");

        self.events.publish(
            DomainEvent::now(EventKind::RecordUpdated, id, Some(principal.id.clone()))
                .model(model.name.clone())
                .before(existing.to_value())
                .after(updated.to_value()),
        );
        Ok(updated)
    }

    pub async fn delete(&self, principal: &Principal, model_name: &str, id: &str) -> Result<()> {
        let model = self.load_model(model_name).await?;
        authorize_action(principal, Action::Delete, &model)?;

        let existing = self.load_record(&model, id).await?;
        authorize_record(principal, &model, &existing)?;

        if !self.records.delete(&model.name, id).await? {
            return Err(AppError::NotFound(format!("Record '{}' not found", id)));
        }
        tracing::info!(model = %model.name, record_id = %id, user_id = %principal.id, "Record deleted");

        self.events.publish(
            DomainEvent::now(EventKind::RecordDeleted, id, Some(principal.id.clone()))
                .model(model.name.clone())
                .before(existing.to_value()),
        );
        Ok(())
    }
}
