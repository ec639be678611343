//! Field and model validation driven by runtime model definitions.
//!
//! Nothing here knows the fields at compile time: every check is derived from
//! the [`ModelField`] declarations of a [`ModelDefinition`]. Values arrive as
//! loosely typed JSON and are coerced the way a form submission would be
//! (numeric strings count as numbers, numbers count as strings, and so on).
//!
//! Validation never fails with an error of its own. Each field yields at most
//! one human-readable message, and the model validator collects them.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

use crate::models::model_definition::{FieldType, FieldValidation, ModelDefinition, ModelField};

/// Field name to error message, in field declaration order. Empty means the
/// payload is valid.
pub type FieldErrors = IndexMap<String, String>;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles"));

/// Date-time layouts accepted besides RFC 3339 and plain dates.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Validate one value against one field declaration.
///
/// `None` and JSON `null` are both treated as "no value". Returns the first
/// failing check's message, or `None` when the value is acceptable.
pub fn validate_field(value: Option<&Value>, field: &ModelField) -> Option<String> {
    let name = field.display_name();

    let value = match value {
        Some(v) if !is_empty(v) => v,
        _ if field.is_required() => return Some(format!("{} is required", name)),
        _ => return None,
    };

    let no_constraints = FieldValidation::default();
    let rules = field.validation.as_ref().unwrap_or(&no_constraints);

    match field.field_type {
        FieldType::Number => check_number(value, name, rules),
        FieldType::String => check_text(value, name, rules).err(),
        FieldType::Email => match check_text(value, name, rules) {
            Err(message) => Some(message),
            Ok(text) if !EMAIL_RE.is_match(&text) => Some(format!("{} must be a valid email", name)),
            Ok(_) => None,
        },
        FieldType::Url => match check_text(value, name, rules) {
            Err(message) => Some(message),
            Ok(text) if url::Url::parse(&text).is_err() => {
                Some(format!("{} must be a valid URL", name))
            }
            Ok(_) => None,
        },
        FieldType::Date => {
            (!is_valid_date(value)).then(|| format!("{} must be a valid date", name))
        }
        FieldType::Boolean => {
            (!is_boolean(value)).then(|| format!("{} must be a boolean value", name))
        }
    }
}

/// Validate a payload against every declared field, in declaration order.
///
/// Keys in `data` that the model does not declare are ignored.
pub fn validate_model_data(data: &Map<String, Value>, model: &ModelDefinition) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in &model.fields {
        if let Some(message) = validate_field(data.get(&field.name), field) {
            errors.insert(field.name.clone(), message);
        }
    }
    errors
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn check_number(value: &Value, name: &str, rules: &FieldValidation) -> Option<String> {
    let Some(number) = coerce_number(value) else {
        return Some(format!("{} must be a number", name));
    };
    if let Some(min) = rules.min {
        if number < min {
            return Some(format!("{} must be at least {}", name, min));
        }
    }
    if let Some(max) = rules.max {
        if number > max {
            return Some(format!("{} must be at most {}", name, max));
        }
    }
    None
}

/// Length and pattern checks shared by string, email and url fields.
///
/// Returns the coerced text on success so type-specific format checks can
/// run on the same representation.
fn check_text<'a>(
    value: &'a Value,
    name: &str,
    rules: &FieldValidation,
) -> Result<Cow<'a, str>, String> {
    let text = coerce_string(value);
    let length = text.chars().count();

    if let Some(min_length) = rules.min_length {
        if length < min_length {
            return Err(format!(
                "{} must be at least {} characters",
                name, min_length
            ));
        }
    }
    if let Some(max_length) = rules.max_length {
        if length > max_length {
            return Err(format!(
                "{} must be at most {} characters",
                name, max_length
            ));
        }
    }
    if let Some(pattern) = rules.pattern.as_deref() {
        if !matches_whole(pattern, &text) {
            return Err(format!("{} format is invalid", name));
        }
    }
    Ok(text)
}

/// Full-string regex test. An uncompilable pattern never matches.
fn matches_whole(pattern: &str, text: &str) -> bool {
    match Regex::new(&format!("^(?:{})$", pattern)) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Ignoring value: field pattern does not compile");
            false
        }
    }
}

/// Numeric coercion: numbers as-is, trimmed numeric strings, booleans as 1/0.
/// Whitespace-only strings coerce to 0. Non-finite results are rejected.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    number.filter(|n| n.is_finite())
}

fn coerce_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}

fn is_valid_date(value: &Value) -> bool {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|ms| ms.is_finite())
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
            .is_some(),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || NAIVE_DATETIME_FORMATS
                    .iter()
                    .any(|format| NaiveDateTime::parse_from_str(s, format).is_ok())
        }
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::String(s) => s == "true" || s == "false",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::model_definition::ModelDefinitionInput;
    use crate::models::role::PermissionRule;
    use chrono::Utc;
    use serde_json::json;

    fn field(field_type: FieldType, validation: FieldValidation) -> ModelField {
        ModelField::new("value", field_type).with_validation(validation)
    }

    fn check(value: Value, field: &ModelField) -> Option<String> {
        validate_field(Some(&value), field)
    }

    fn required() -> FieldValidation {
        FieldValidation {
            required: Some(true),
            ..Default::default()
        }
    }

    // -----------------------------------------------------------------------
    // Required / empty handling
    // -----------------------------------------------------------------------

    #[test]
    fn test_required_missing_value() {
        let f = field(FieldType::String, required());
        assert_eq!(validate_field(None, &f), Some("value is required".into()));
        assert_eq!(check(Value::Null, &f), Some("value is required".into()));
        assert_eq!(check(json!(""), &f), Some("value is required".into()));
    }

    #[test]
    fn test_optional_missing_value_passes() {
        let f = field(
            FieldType::Number,
            FieldValidation {
                required: Some(false),
                min: Some(10.0),
                ..Default::default()
            },
        );
        assert_eq!(validate_field(None, &f), None);
        assert_eq!(check(json!(""), &f), None);
        assert_eq!(check(Value::Null, &f), None);
    }

    #[test]
    fn test_legacy_required_flag() {
        let mut f = ModelField::new("title", FieldType::String).with_label("Title");
        f.required = Some(true);
        assert_eq!(validate_field(None, &f), Some("Title is required".into()));
    }

    #[test]
    fn test_whitespace_string_is_not_empty() {
        let f = field(FieldType::String, required());
        assert_eq!(check(json!(" "), &f), None);
    }

    #[test]
    fn test_false_and_zero_are_not_empty() {
        let b = field(FieldType::Boolean, required());
        assert_eq!(check(json!(false), &b), None);
        let n = field(FieldType::Number, required());
        assert_eq!(check(json!(0), &n), None);
    }

    // -----------------------------------------------------------------------
    // Numbers
    // -----------------------------------------------------------------------

    #[test]
    fn test_number_rejects_non_numeric() {
        let f = field(FieldType::Number, FieldValidation::default());
        assert_eq!(check(json!("abc"), &f), Some("value must be a number".into()));
        assert_eq!(check(json!({"n": 1}), &f), Some("value must be a number".into()));
        assert_eq!(check(json!([1]), &f), Some("value must be a number".into()));
        assert_eq!(check(json!("Infinity"), &f), Some("value must be a number".into()));
        assert_eq!(check(json!("NaN"), &f), Some("value must be a number".into()));
    }

    #[test]
    fn test_number_coercion() {
        let f = field(FieldType::Number, FieldValidation::default());
        assert_eq!(check(json!(99.99), &f), None);
        assert_eq!(check(json!(" 42 "), &f), None);
        assert_eq!(check(json!("1e3"), &f), None);
        assert_eq!(check(json!(true), &f), None);
        assert_eq!(coerce_number(&json!("   ")), Some(0.0));
        assert_eq!(coerce_number(&json!(false)), Some(0.0));
    }

    #[test]
    fn test_number_min_is_inclusive() {
        let f = field(
            FieldType::Number,
            FieldValidation {
                min: Some(10.0),
                ..Default::default()
            },
        );
        assert_eq!(check(json!(5), &f), Some("value must be at least 10".into()));
        assert_eq!(check(json!(10), &f), None);
        assert_eq!(check(json!("9.5"), &f), Some("value must be at least 10".into()));
    }

    #[test]
    fn test_number_max_is_inclusive() {
        let f = field(
            FieldType::Number,
            FieldValidation {
                max: Some(2.5),
                ..Default::default()
            },
        );
        assert_eq!(check(json!(2.5), &f), None);
        assert_eq!(check(json!(3), &f), Some("value must be at most 2.5".into()));
    }

    #[test]
    fn test_number_type_error_before_bounds() {
        let f = field(
            FieldType::Number,
            FieldValidation {
                min: Some(1.0),
                max: Some(2.0),
                ..Default::default()
            },
        );
        assert_eq!(check(json!("lots"), &f), Some("value must be a number".into()));
    }

    // -----------------------------------------------------------------------
    // Strings
    // -----------------------------------------------------------------------

    #[test]
    fn test_string_length_bounds_inclusive() {
        let f = field(
            FieldType::String,
            FieldValidation {
                min_length: Some(2),
                max_length: Some(4),
                ..Default::default()
            },
        );
        assert_eq!(
            check(json!("a"), &f),
            Some("value must be at least 2 characters".into())
        );
        assert_eq!(check(json!("ab"), &f), None);
        assert_eq!(check(json!("abcd"), &f), None);
        assert_eq!(
            check(json!("abcde"), &f),
            Some("value must be at most 4 characters".into())
        );
    }

    #[test]
    fn test_string_length_counts_characters() {
        let f = field(
            FieldType::String,
            FieldValidation {
                max_length: Some(3),
                ..Default::default()
            },
        );
        assert_eq!(check(json!("héé"), &f), None);
    }

    #[test]
    fn test_string_pattern_is_full_match() {
        let f = field(
            FieldType::String,
            FieldValidation {
                pattern: Some("[A-Z]{3}-\\d+".into()),
                ..Default::default()
            },
        );
        assert_eq!(check(json!("ABC-12"), &f), None);
        assert_eq!(
            check(json!("xABC-12"), &f),
            Some("value format is invalid".into())
        );
        assert_eq!(
            check(json!("ABC-12x"), &f),
            Some("value format is invalid".into())
        );
    }

    #[test]
    fn test_string_pattern_alternation_anchored() {
        let f = field(
            FieldType::String,
            FieldValidation {
                pattern: Some("draft|published".into()),
                ..Default::default()
            },
        );
        assert_eq!(check(json!("draft"), &f), None);
        assert!(check(json!("draft2"), &f).is_some());
        assert!(check(json!("unpublished"), &f).is_some());
    }

    #[test]
    fn test_string_checks_run_in_order() {
        let f = field(
            FieldType::String,
            FieldValidation {
                min_length: Some(5),
                pattern: Some("\\d+".into()),
                ..Default::default()
            },
        );
        assert_eq!(
            check(json!("ab"), &f),
            Some("value must be at least 5 characters".into())
        );
        assert_eq!(
            check(json!("abcdef"), &f),
            Some("value format is invalid".into())
        );
    }

    #[test]
    fn test_string_coerces_numbers() {
        let f = field(
            FieldType::String,
            FieldValidation {
                max_length: Some(3),
                ..Default::default()
            },
        );
        assert_eq!(check(json!(123), &f), None);
        assert_eq!(
            check(json!(12345), &f),
            Some("value must be at most 3 characters".into())
        );
    }

    #[test]
    fn test_uncompilable_pattern_rejects() {
        let f = field(
            FieldType::String,
            FieldValidation {
                pattern: Some("([a-z".into()),
                ..Default::default()
            },
        );
        assert_eq!(check(json!("abc"), &f), Some("value format is invalid".into()));
    }

    // -----------------------------------------------------------------------
    // Email / URL
    // -----------------------------------------------------------------------

    #[test]
    fn test_email_format() {
        let f = field(FieldType::Email, FieldValidation::default());
        assert_eq!(
            check(json!("not-an-email"), &f),
            Some("value must be a valid email".into())
        );
        assert_eq!(check(json!("a@b.com"), &f), None);
        assert!(check(json!("a@b"), &f).is_some());
        assert!(check(json!("a b@c.com"), &f).is_some());
    }

    #[test]
    fn test_email_length_checked_before_format() {
        let f = field(
            FieldType::Email,
            FieldValidation {
                max_length: Some(5),
                ..Default::default()
            },
        );
        assert_eq!(
            check(json!("someone@example.com"), &f),
            Some("value must be at most 5 characters".into())
        );
    }

    #[test]
    fn test_url_format() {
        let f = field(FieldType::Url, FieldValidation::default());
        assert_eq!(check(json!("https://example.com/a?b=c"), &f), None);
        assert_eq!(
            check(json!("example.com"), &f),
            Some("value must be a valid URL".into())
        );
        assert_eq!(
            check(json!("/relative/path"), &f),
            Some("value must be a valid URL".into())
        );
    }

    // -----------------------------------------------------------------------
    // Dates / booleans
    // -----------------------------------------------------------------------

    #[test]
    fn test_date_formats() {
        let f = field(FieldType::Date, FieldValidation::default());
        assert_eq!(check(json!("2024-01-15"), &f), None);
        assert_eq!(check(json!("2024-01-15T10:30:00Z"), &f), None);
        assert_eq!(check(json!("2024-01-15T10:30:00+02:00"), &f), None);
        assert_eq!(check(json!("2024-01-15T10:30:00"), &f), None);
        assert_eq!(check(json!("2024-01-15T10:30"), &f), None);
        assert_eq!(check(json!("2024-01-15 10:30:00"), &f), None);
        assert_eq!(check(json!(1_700_000_000_000_i64), &f), None);
    }

    #[test]
    fn test_date_rejects_invalid() {
        let f = field(FieldType::Date, FieldValidation::default());
        let expected = Some("value must be a valid date".to_string());
        assert_eq!(check(json!("2024-02-30"), &f), expected);
        assert_eq!(check(json!("yesterday"), &f), expected);
        assert_eq!(check(json!(true), &f), expected);
    }

    #[test]
    fn test_boolean_values() {
        let f = field(FieldType::Boolean, FieldValidation::default());
        assert_eq!(check(json!(true), &f), None);
        assert_eq!(check(json!("false"), &f), None);
        let expected = Some("value must be a boolean value".to_string());
        assert_eq!(check(json!("yes"), &f), expected);
        assert_eq!(check(json!("TRUE"), &f), expected);
        assert_eq!(check(json!(1), &f), expected);
    }

    #[test]
    fn test_label_used_in_messages() {
        let f = ModelField::new("qty", FieldType::Number).with_label("Quantity");
        assert_eq!(check(json!("x"), &f), Some("Quantity must be a number".into()));
    }

    // -----------------------------------------------------------------------
    // Model validation
    // -----------------------------------------------------------------------

    fn product_model() -> ModelDefinition {
        ModelDefinition::from_input(
            ModelDefinitionInput {
                name: "Product".into(),
                fields: vec![
                    ModelField::new("name", FieldType::String).with_validation(required()),
                    ModelField::new("price", FieldType::Number).with_validation(FieldValidation {
                        required: Some(true),
                        min: Some(0.0),
                        ..Default::default()
                    }),
                    ModelField::new("website", FieldType::Url),
                ],
                owner_field: None,
                permissions: PermissionRule::default(),
            },
            Utc::now(),
        )
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_model_valid_payload_has_no_errors() {
        let errors = validate_model_data(&payload(json!({"price": 99.99, "name": "x"})), &product_model());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_model_collects_every_failing_field() {
        let errors = validate_model_data(
            &payload(json!({"price": -1, "website": "nope"})),
            &product_model(),
        );
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["name"], "name is required");
        assert_eq!(errors["price"], "price must be at least 0");
        assert_eq!(errors["website"], "website must be a valid URL");
    }

    #[test]
    fn test_model_errors_follow_declaration_order() {
        let mut model = product_model();
        model.fields.reverse();
        let errors = validate_model_data(&payload(json!({"price": "x", "website": "nope"})), &model);
        let keys: Vec<_> = errors.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["website", "price", "name"]);
    }

    #[test]
    fn test_model_ignores_undeclared_keys() {
        let errors = validate_model_data(
            &payload(json!({"name": "x", "price": 1, "colour": {"not": "checked"}})),
            &product_model(),
        );
        assert!(errors.is_empty());
    }
}
