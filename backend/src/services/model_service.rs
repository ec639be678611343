//! Model definition management.
//!
//! Admins create, update and delete the schemas that drive validation and
//! permissions for every record endpoint. Definitions are checked for
//! internal consistency before they are saved, so a bad regex or a dangling
//! owner field is rejected here instead of surfacing on every later write.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::model_definition::{FieldType, ModelDefinition, ModelDefinitionInput};
use crate::models::role::Role;
use crate::models::user::Principal;
use crate::services::event_bus::{DomainEvent, EventBus, EventKind};
use crate::services::permission_service::require_role;
use crate::storage::{ModelStore, RecordStore};

static MODEL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,63}$").expect("model name regex compiles"));

/// Model definition service
pub struct ModelService {
    models: Arc<dyn ModelStore>,
    records: Arc<dyn RecordStore>,
    events: Arc<EventBus>,
}

impl ModelService {
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

    pub async fn list(&self) -> Result<Vec<ModelDefinition>> {
        self.models.list().await
    }

    pub async fn get(&self, name: &str) -> Result<ModelDefinition> {
        self.models
            .get(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Model '{}' not found", name)))
    }

    pub async fn create(&self, actor: &Principal, input: ModelDefinitionInput) -> Result<ModelDefinition> {
        require_role(actor, Role::Admin)?;
        check_definition(&input)?;

        let model = ModelDefinition::from_input(input, Utc::now());
        if !self.models.insert_new(model.clone()).await? {
            return Err(AppError::Conflict(format!(
                "Model '{}' already exists",
                model.name
            )));
        }

        tracing::info!(model = %model.name, fields = model.fields.len(), "Model created");
        self.events.publish(
            DomainEvent::now(EventKind::ModelCreated, model.name.clone(), Some(actor.id.clone()))
                .model(model.name.clone())
                .after(serde_json::to_value(&model)?),
        );
        Ok(model)
    }

    /// Replace a definition. The name cannot change; `created_at` is kept and
    /// `version` is bumped.
    pub async fn update(
        &self,
        actor: &Principal,
        name: &str,
        input: ModelDefinitionInput,
    ) -> Result<ModelDefinition> {
        require_role(actor, Role::Admin)?;
        if input.name != name {
            return Err(AppError::Validation(format!(
                "Model name in body ('{}') does not match path ('{}'); renaming is not supported",
                input.name, name
            )));
        }
        check_definition(&input)?;

        let previous = self.get(name).await?;
        let model = ModelDefinition {
            name: input.name,
            fields: input.fields,
            owner_field: input.owner_field,
            permissions: input.permissions,
            version: previous.version + 1,
            created_at: previous.created_at,
            updated_at: Utc::now(),
        };
        self.models.save(model.clone()).await?;

        tracing::info!(model = %model.name, version = model.version, "Model updated");
        self.events.publish(
            DomainEvent::now(EventKind::ModelUpdated, model.name.clone(), Some(actor.id.clone()))
                .model(model.name.clone())
                .before(serde_json::to_value(&previous)?)
                .after(serde_json::to_value(&model)?),
        );
        Ok(model)
    }

    /// Delete a definition. Records are left orphaned unless `purge_records`.
    pub async fn delete(&self, actor: &Principal, name: &str, purge_records: bool) -> Result<()> {
        require_role(actor, Role::Admin)?;
        let previous = self.get(name).await?;
        if !self.models.delete(name).await? {
            return Err(AppError::NotFound(format!("Model '{}' not found", name)));
        }

        let purged = if purge_records {
            self.records.delete_all(name).await?
        } else {
            0
        };
        tracing::info!(model = %name, purged, "Model deleted");

        self.events.publish(
            DomainEvent::now(EventKind::ModelDeleted, name, Some(actor.id.clone()))
                .model(name)
                .before(serde_json::to_value(&previous)?),
        );
        Ok(())
    }
}

/// Reject definitions that could never validate or authorize consistently.
pub fn check_definition(input: &ModelDefinitionInput) -> Result<()> {
    let mut problems = Vec::new();

    if !MODEL_NAME_RE.is_match(&input.name) {
        problems.push(format!(
            "model name '{}' must start with a letter and contain only letters, digits or '_' (max 64)",
            input.name
        ));
    }
    if input.fields.is_empty() {
        problems.push("model must declare at least one field".to_string());
    }

    let mut seen = HashSet::new();
    for field in &input.fields {
        if field.name.trim().is_empty() {
            problems.push("field names must not be empty".to_string());
            continue;
        }
        if field.name == crate::models::record::ID_KEY {
            problems.push("'id' is reserved for the record id".to_string());
        }
        if !seen.insert(field.name.as_str()) {
            problems.push(format!("duplicate field '{}'", field.name));
        }

        let Some(rules) = &field.validation else {
            continue;
        };
        if let (Some(min), Some(max)) = (rules.min, rules.max) {
            if min > max {
                problems.push(format!("field '{}': min is greater than max", field.name));
            }
        }
        if let (Some(min), Some(max)) = (rules.min_length, rules.max_length) {
            if min > max {
                problems.push(format!(
                    "field '{}': minLength is greater than maxLength",
                    field.name
                ));
            }
        }
        if let Some(pattern) = &rules.pattern {
            if let Err(e) = Regex::new(pattern) {
                problems.push(format!("field '{}': invalid pattern: {}", field.name, e));
            }
        }
    }

    // Owner values are principal ids, so the field must hold a string.
    if let Some(owner_field) = &input.owner_field {
        match input.fields.iter().find(|f| &f.name == owner_field) {
            None => problems.push(format!(
                "ownerField '{}' is not a declared field",
                owner_field
            )),
            Some(field) if field.field_type != FieldType::String => problems.push(format!(
                "ownerField '{}' must be a string field, not {}",
                owner_field,
                field.field_type.as_str()
            )),
            Some(_) => {}
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::model_definition::{FieldValidation, ModelField};
    use crate::services::event_bus::DomainEvent;
    use crate::storage::filesystem::FilesystemStore;
    use crate::models::role::{Action, PermissionRule};
    use crate::storage::memory::MemoryStore;
    use serde_json::Map;

    fn service() -> (ModelService, Arc<MemoryStore>, Arc<EventBus>) {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(EventBus::new(16));
        let svc = ModelService::new(store.clone(), store.clone(), events.clone());
        (svc, store, events)
    }

    fn admin() -> Principal {
        Principal::new("root", Role::Admin)
    }

    fn product_input() -> ModelDefinitionInput {
        ModelDefinitionInput {
            name: "Product".into(),
            fields: vec![
                ModelField::new("name", FieldType::String),
                ModelField::new("ownerId", FieldType::String),
            ],
            owner_field: Some("ownerId".into()),
            permissions: PermissionRule::default().allow(Action::Read, [Role::Viewer]),
        }
    }

    #[test]
    fn test_check_definition_accepts_valid() {
        assert!(check_definition(&product_input()).is_ok());
    }

    #[test]
    fn test_check_definition_reports_all_problems() {
        let mut input = product_input();
        input.name = "9 bad name".into();
        input.owner_field = Some("creator".into());
        input.fields.push(ModelField::new("name", FieldType::Number));
        input.fields.push(
            ModelField::new("code", FieldType::String).with_validation(FieldValidation {
                pattern: Some("(unclosed".into()),
                min_length: Some(5),
                max_length: Some(2),
                ..Default::default()
            }),
        );

        let Err(AppError::Validation(msg)) = check_definition(&input) else {
            panic!("expected validation error");
        };
        assert!(msg.contains("model name"));
        assert!(msg.contains("duplicate field 'name'"));
        assert!(msg.contains("invalid pattern"));
        assert!(msg.contains("minLength"));
        assert!(msg.contains("ownerField 'creator'"));
    }

    #[test]
    fn test_check_definition_rejects_empty_and_reserved() {
        let mut input = product_input();
        input.fields = vec![];
        input.owner_field = None;
        assert!(check_definition(&input).is_err());

        input.fields = vec![ModelField::new("id", FieldType::String)];
        assert!(check_definition(&input).is_err());
    }

    #[tokio::test]
    async fn test_create_then_conflict() {
        let (svc, _, _) = service();
        let model = svc.create(&admin(), product_input()).await.unwrap();
        assert_eq!(model.version, 1);
        assert_eq!(svc.get("Product").await.unwrap(), model);

        let err = svc.create(&admin(), product_input()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_check_definition_requires_string_owner_field() {
        for field_type in [FieldType::Number, FieldType::Boolean, FieldType::Date, FieldType::Url] {
            let mut input = product_input();
            input.fields[1] = ModelField::new("ownerId", field_type);
            let Err(AppError::Validation(msg)) = check_definition(&input) else {
                panic!("ownerId as {} should be rejected", field_type.as_str());
            };
            assert!(msg.contains("ownerField 'ownerId' must be a string field"));
        }
    }

    #[tokio::test]
    async fn test_concurrent_creates_of_one_name_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FilesystemStore::new(dir.path()));
        let events = Arc::new(EventBus::new(256));
        let mut rx = events.subscribe();
        let svc = Arc::new(ModelService::new(store.clone(), store.clone(), events.clone()));

        for round in 0..20 {
            let mut input = product_input();
            input.name = format!("Product{}", round);
            let tasks: Vec<_> = (0..2)
                .map(|_| {
                    let svc = svc.clone();
                    let input = input.clone();
                    tokio::spawn(async move { svc.create(&admin(), input).await })
                })
                .collect();

            let mut created = 0;
            for task in tasks {
                match task.await.unwrap() {
                    Ok(_) => created += 1,
                    Err(AppError::Conflict(_)) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            assert_eq!(created, 1, "{} created more than once", input.name);
        }

        let mut published = Vec::<DomainEvent>::new();
        while let Ok(event) = rx.try_recv() {
            published.push(event);
        }
        assert_eq!(published.len(), 20);
        assert!(published.iter().all(|e| e.kind == EventKind::ModelCreated));
    }

    #[tokio::test]
    async fn test_only_admin_manages_models() {
        let (svc, _, _) = service();
        let manager = Principal::new("m1", Role::Manager);
        let err = svc.create(&manager, product_input()).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_keeps_created_at() {
        let (svc, _, events) = service();
        let created = svc.create(&admin(), product_input()).await.unwrap();
        let mut rx = events.subscribe();

        let mut input = product_input();
        input.fields.push(ModelField::new("price", FieldType::Number));
        let updated = svc.update(&admin(), "Product", input).await.unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.fields.len(), 3);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::ModelUpdated);
        assert_eq!(event.before.unwrap()["version"], 1);
        assert_eq!(event.after.unwrap()["version"], 2);
    }

    #[tokio::test]
    async fn test_update_rejects_rename_and_missing() {
        let (svc, _, _) = service();
        let err = svc.update(&admin(), "Product", product_input()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        svc.create(&admin(), product_input()).await.unwrap();
        let mut renamed = product_input();
        renamed.name = "Item".into();
        let err = svc.update(&admin(), "Product", renamed).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_orphans_records_by_default() {
        let (svc, store, _) = service();
        svc.create(&admin(), product_input()).await.unwrap();
        RecordStore::create(store.as_ref(), "Product", Map::new()).await.unwrap();

        svc.delete(&admin(), "Product", false).await.unwrap();
        assert!(matches!(svc.get("Product").await, Err(AppError::NotFound(_))));
        assert_eq!(RecordStore::list(store.as_ref(), "Product").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_with_purge() {
        let (svc, store, _) = service();
        svc.create(&admin(), product_input()).await.unwrap();
        RecordStore::create(store.as_ref(), "Product", Map::new()).await.unwrap();

        svc.delete(&admin(), "Product", true).await.unwrap();
        assert!(RecordStore::list(store.as_ref(), "Product").await.unwrap().is_empty());
        assert!(matches!(
            svc.delete(&admin(), "Product", true).await,
            Err(AppError::NotFound(_))
        ));
    }
}
