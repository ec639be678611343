//! Model definition (dynamic schema) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::PermissionRule;

/// Declared type of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Email,
    Url,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Url => "url",
        }
    }
}

/// Optional per-field constraints. All are independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Inclusive lower bound for number fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for number fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Minimum length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression the whole value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// One field of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelField {
    /// Record property key; unique within the model
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
    /// Human-readable label used in validation messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Legacy location of the required flag, merged with `validation.required`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl ModelField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            validation: None,
            label: None,
            required: None,
        }
    }

    pub fn with_validation(mut self, validation: FieldValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label if set, otherwise the field name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Both `required` locations merged with OR.
    pub fn is_required(&self) -> bool {
        let from_validation = self
            .validation
            .as_ref()
            .and_then(|v| v.required)
            .unwrap_or(false);
        from_validation || self.required.unwrap_or(false)
    }
}

/// Stored schema for one dynamic entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    pub name: String,
    pub fields: Vec<ModelField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_field: Option<String>,
    #[serde(default)]
    pub permissions: PermissionRule,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModelDefinition {
    /// Build a fresh version-1 definition from admin input.
    pub fn from_input(input: ModelDefinitionInput, now: DateTime<Utc>) -> Self {
        Self {
            name: input.name,
            fields: input.fields,
            owner_field: input.owner_field,
            permissions: input.permissions,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Admin-supplied model definition body (create and update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinitionInput {
    pub name: String,
    pub fields: Vec<ModelField>,
    #[serde(default)]
    pub owner_field: Option<String>,
    #[serde(default)]
    pub permissions: PermissionRule,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::{Action, Role};

    #[test]
    fn test_required_merges_both_locations() {
        let plain = ModelField::new("title", FieldType::String);
        assert!(!plain.is_required());

        let mut legacy = plain.clone();
        legacy.required = Some(true);
        assert!(legacy.is_required());

        let nested = plain.clone().with_validation(FieldValidation {
            required: Some(true),
            ..Default::default()
        });
        assert!(nested.is_required());

        let mut both_false = nested.clone();
        both_false.validation = Some(FieldValidation {
            required: Some(false),
            ..Default::default()
        });
        both_false.required = Some(false);
        assert!(!both_false.is_required());

        let mut mixed = both_false.clone();
        mixed.required = Some(true);
        assert!(mixed.is_required());
    }

    #[test]
    fn test_display_name_prefers_label() {
        let field = ModelField::new("unit_price", FieldType::Number);
        assert_eq!(field.display_name(), "unit_price");
        assert_eq!(field.with_label("Unit price").display_name(), "Unit price");
    }

    #[test]
    fn test_field_deserialize_camel_case_validation() {
        let json = r#"{
            "name": "sku",
            "type": "string",
            "label": "SKU",
            "validation": {"required": true, "minLength": 3, "maxLength": 12, "pattern": "[A-Z0-9-]+"}
        }"#;
        let field: ModelField = serde_json::from_str(json).unwrap();
        assert_eq!(field.field_type, FieldType::String);
        let v = field.validation.unwrap();
        assert_eq!(v.min_length, Some(3));
        assert_eq!(v.max_length, Some(12));
        assert_eq!(v.pattern.as_deref(), Some("[A-Z0-9-]+"));
    }

    #[test]
    fn test_field_type_rejects_unknown() {
        let json = r#"{"name": "x", "type": "blob"}"#;
        assert!(serde_json::from_str::<ModelField>(json).is_err());
    }

    #[test]
    fn test_definition_input_to_definition() {
        let json = r#"{
            "name": "Product",
            "fields": [{"name": "name", "type": "string"}, {"name": "ownerId", "type": "string"}],
            "ownerField": "ownerId",
            "permissions": {"create": ["admin", "manager"]}
        }"#;
        let input: ModelDefinitionInput = serde_json::from_str(json).unwrap();
        let now = Utc::now();
        let def = ModelDefinition::from_input(input, now);
        assert_eq!(def.version, 1);
        assert_eq!(def.created_at, now);
        assert_eq!(def.owner_field.as_deref(), Some("ownerId"));
        assert_eq!(def.fields.len(), 2);
        assert!(def
            .permissions
            .roles_for(Action::Create)
            .unwrap()
            .contains(&Role::Manager));
    }

    #[test]
    fn test_definition_serializes_camel_case() {
        let def = ModelDefinition::from_input(
            ModelDefinitionInput {
                name: "Note".into(),
                fields: vec![ModelField::new("body", FieldType::String)],
                owner_field: None,
                permissions: PermissionRule::default(),
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&def).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("ownerField").is_none());
        assert_eq!(json["fields"][0]["type"], "string");
    }
}
