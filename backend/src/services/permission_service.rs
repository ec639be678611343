//! Role-based permission and row-level ownership decisions.
//!
//! The free functions in this module are pure: they take request-local
//! values and return plain booleans. The `authorize_*` helpers wrap them for
//! the service layer, turning a denial into [`AppError::Authorization`].

use crate::error::{AppError, Result};
use crate::models::model_definition::ModelDefinition;
use crate::models::record::Record;
use crate::models::role::{Action, PermissionRule, Role};
use crate::models::user::Principal;

/// Whether `role` may perform `action` under `rule`.
///
/// A missing rule, a missing entry for the action, or an empty entry allows
/// Admin only. Otherwise the role must be listed explicitly; the hierarchy
/// is not consulted, so a list that omits Admin denies Admin too.
pub fn can_perform(role: Role, action: Action, rule: Option<&PermissionRule>) -> bool {
    match rule.and_then(|r| r.roles_for(action)) {
        Some(roles) if !roles.is_empty() => roles.contains(&role),
        _ => role == Role::Admin,
    }
}

/// Whether `user_id` may act on a record owned by `owner_id`.
///
/// Admin always may. A record without an owner is shared. Otherwise the ids
/// must be equal byte for byte; an empty owner id is still an owner.
pub fn check_ownership(user_id: &str, owner_id: Option<&str>, role: Role) -> bool {
    if role == Role::Admin {
        return true;
    }
    match owner_id {
        None => true,
        Some(owner) => owner == user_id,
    }
}

/// Keep the records `principal` is allowed to see.
pub fn filter_visible(
    records: Vec<Record>,
    principal: &Principal,
    owner_field: Option<&str>,
) -> Vec<Record> {
    let Some(owner_field) = owner_field else {
        return records;
    };
    if principal.is_admin() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| {
            check_ownership(
                &principal.id,
                record.owner(owner_field).as_deref(),
                principal.role,
            )
        })
        .collect()
}

/// Gate an action on a model by role.
pub fn authorize_action(principal: &Principal, action: Action, model: &ModelDefinition) -> Result<()> {
    if can_perform(principal.role, action, Some(&model.permissions)) {
        return Ok(());
    }
    tracing::info!(
        model = %model.name,
        action = %action,
        role = %principal.role,
        user_id = %principal.id,
        "Permission denied"
    );
    Err(AppError::Authorization(format!(
        "Role '{}' may not {} records of model '{}'",
        principal.role, action, model.name
    )))
}

/// Gate access to one record by ownership.
pub fn authorize_record(principal: &Principal, model: &ModelDefinition, record: &Record) -> Result<()> {
    let owner = model
        .owner_field
        .as_deref()
        .and_then(|field| record.owner(field));
    if check_ownership(&principal.id, owner.as_deref(), principal.role) {
        return Ok(());
    }
    tracing::info!(
        model = %model.name,
        record_id = %record.id,
        user_id = %principal.id,
        "Ownership check failed"
    );
    Err(AppError::Authorization(
        "You do not own this record".to_string(),
    ))
}

/// Route-level gate using the role hierarchy.
pub fn require_role(principal: &Principal, minimum: Role) -> Result<()> {
    if principal.role.outranks(minimum) {
        Ok(())
    } else {
        Err(AppError::Authorization(format!(
            "{} access required",
            minimum
        )))
    }
}
