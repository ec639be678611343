//! End-to-end authorization tests over the in-memory store.
//!
//! Drives the record service the way the HTTP handlers do, without a server.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};

use formwork_backend::models::model_definition::{
    FieldType, FieldValidation, ModelDefinition, ModelDefinitionInput, ModelField,
};
use formwork_backend::models::role::{Action, PermissionRule, Role};
use formwork_backend::models::user::Principal;
use formwork_backend::services::event_bus::EventBus;
use formwork_backend::services::model_service::ModelService;
use formwork_backend::services::permission_service::{can_perform, check_ownership};
use formwork_backend::services::record_service::RecordService;
use formwork_backend::services::validation_service::{validate_field, validate_model_data};
use formwork_backend::storage::memory::MemoryStore;
use formwork_backend::storage::RecordStore;
use formwork_backend::AppError;

fn product_input() -> ModelDefinitionInput {
    ModelDefinitionInput {
        name: "Product".into(),
        fields: vec![
            ModelField::new("name", FieldType::String).with_validation(FieldValidation {
                required: Some(true),
                ..Default::default()
            }),
            ModelField::new("price", FieldType::Number).with_validation(FieldValidation {
                required: Some(true),
                min: Some(0.0),
                ..Default::default()
            }),
            ModelField::new("ownerId", FieldType::String),
        ],
        owner_field: Some("ownerId".into()),
        permissions: PermissionRule::default()
            .allow(Action::Create, [Role::Admin, Role::Manager])
            .allow(Action::Read, [Role::Admin, Role::Manager, Role::Viewer])
            .allow(Action::Update, [Role::Admin, Role::Manager])
            .allow(Action::Delete, [Role::Admin]),
    }
}

struct Platform {
    records: RecordService,
    store: Arc<MemoryStore>,
}

async fn platform() -> Platform {
    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(EventBus::new(64));
    let models = ModelService::new(store.clone(), store.clone(), events.clone());
    models
        .create(&Principal::new("root", Role::Admin), product_input())
        .await
        .unwrap();
    Platform {
        records: RecordService::new(store.clone(), store.clone(), events),
        store,
    }
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn product_scenario_create_sets_owner() {
    let p = platform().await;
    let m1 = Principal::new("m1", Role::Manager);

    let record = p
        .records
        .create(&m1, "Product", object(json!({"name": "Widget", "price": 99.99})))
        .await
        .unwrap();

    assert_eq!(record.data["ownerId"], "m1");
    let stored = RecordStore::get(p.store.as_ref(), "Product", &record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn product_scenario_viewer_update_denied_by_role_before_ownership() {
    let p = platform().await;
    let m1 = Principal::new("m1", Role::Manager);
    let v1 = Principal::new("v1", Role::Viewer);

    let by_m1 = p
        .records
        .create(&m1, "Product", object(json!({"name": "Widget", "price": 1})))
        .await
        .unwrap();
    // A record the viewer would own: ownership alone would let the update through.
    let by_v1 = RecordStore::create(
        p.store.as_ref(),
        "Product",
        object(json!({"name": "Gadget", "price": 2, "ownerId": "v1"})),
    )
    .await
    .unwrap();

    for id in [&by_m1.id, &by_v1.id] {
        let err = p
            .records
            .update(&v1, "Product", id, object(json!({"price": 3})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)), "{err:?}");
    }

    // The viewer can still read.
    assert_eq!(p.records.list(&v1, "Product").await.unwrap().len(), 1);
}

#[tokio::test]
async fn product_scenario_list_filters_other_managers_records() {
    let p = platform().await;
    let m1 = Principal::new("m1", Role::Manager);
    let m2 = Principal::new("m2", Role::Manager);

    let mine = p
        .records
        .create(&m1, "Product", object(json!({"name": "Mine", "price": 1})))
        .await
        .unwrap();
    p.records
        .create(&m2, "Product", object(json!({"name": "Theirs", "price": 1})))
        .await
        .unwrap();

    let visible = p.records.list(&m1, "Product").await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, mine.id);

    let admin = Principal::new("root", Role::Admin);
    assert_eq!(p.records.list(&admin, "Product").await.unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_payload_reports_every_field() {
    let p = platform().await;
    let m1 = Principal::new("m1", Role::Manager);

    let err = p
        .records
        .create(&m1, "Product", object(json!({"price": "cheap"})))
        .await
        .unwrap_err();
    let AppError::InvalidRecord(errors) = err else {
        panic!("expected InvalidRecord, got {err:?}");
    };
    assert_eq!(errors.len(), 2);
    assert_eq!(errors["name"], "name is required");
    assert_eq!(errors["price"], "price must be a number");
}

#[test]
fn permission_properties() {
    let roles = [Role::Admin, Role::Manager, Role::Viewer];
    let actions = [Action::Create, Action::Read, Action::Update, Action::Delete];

    for a in roles {
        assert!(a.outranks(a));
        for b in roles {
            if a != b {
                assert_ne!(a.outranks(b), b.outranks(a));
            }
            for c in roles {
                if a.outranks(b) && b.outranks(c) {
                    assert!(a.outranks(c));
                }
            }
        }
    }

    for role in roles {
        for action in actions {
            let expected = role == Role::Admin;
            assert_eq!(can_perform(role, action, None), expected);
            assert_eq!(can_perform(role, action, Some(&PermissionRule::default())), expected);
        }
    }

    let managers_only = PermissionRule::default().allow(Action::Create, [Role::Manager]);
    assert!(!can_perform(Role::Admin, Action::Create, Some(&managers_only)));

    for owner in [None, Some(""), Some("someone")] {
        assert!(check_ownership("any", owner, Role::Admin));
    }
    assert!(check_ownership("u", None, Role::Viewer));
    assert!(check_ownership("x", Some("x"), Role::Viewer));
    assert!(!check_ownership("x", Some("X"), Role::Viewer));
}

#[test]
fn validation_properties() {
    let required = ModelField::new("name", FieldType::String).with_validation(FieldValidation {
        required: Some(true),
        ..Default::default()
    });
    assert!(validate_field(None, &required).is_some());
    let optional = ModelField::new("name", FieldType::String).with_validation(FieldValidation {
        required: Some(false),
        ..Default::default()
    });
    assert!(validate_field(None, &optional).is_none());

    let number = ModelField::new("qty", FieldType::Number);
    assert_eq!(
        validate_field(Some(&json!("abc")), &number).as_deref(),
        Some("qty must be a number")
    );

    let at_least_ten = ModelField::new("qty", FieldType::Number).with_validation(FieldValidation {
        min: Some(10.0),
        ..Default::default()
    });
    assert!(validate_field(Some(&json!(5)), &at_least_ten).is_some());
    assert!(validate_field(Some(&json!(10)), &at_least_ten).is_none());

    let email = ModelField::new("contact", FieldType::Email);
    assert!(validate_field(Some(&json!("not-an-email")), &email).is_some());
    assert!(validate_field(Some(&json!("a@b.com")), &email).is_none());

    let model = ModelDefinition::from_input(product_input(), Utc::now());
    let data = object(json!({"price": 99.99, "name": "x"}));
    assert!(validate_model_data(&data, &model).is_empty());
}
