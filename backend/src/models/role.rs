//! Role and permission models.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role.
///
/// The set is closed: there is no way to construct a fourth value, and
/// deserializing any other string fails. Variants are declared lowest
/// privilege first so the derived `Ord` agrees with [`Role::outranks`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Manager,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Viewer];

    /// Privilege weight: Admin=3, Manager=2, Viewer=1.
    pub fn weight(self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Manager => 2,
            Role::Viewer => 1,
        }
    }

    /// Whether `self` is at least as privileged as `other`.
    ///
    /// Reflexive: every role outranks itself.
    pub fn outranks(self, other: Role) -> bool {
        self.weight() >= other.weight()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// CRUD action on a model's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-action allow-lists of roles for one model.
///
/// A missing or empty entry is meaningful: it restricts the action to
/// [`Role::Admin`] (see `services::permission_service::can_perform`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Role>>)]
    pub create: Option<BTreeSet<Role>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Role>>)]
    pub read: Option<BTreeSet<Role>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Role>>)]
    pub update: Option<BTreeSet<Role>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Role>>)]
    pub delete: Option<BTreeSet<Role>>,
}

impl PermissionRule {
    /// Roles declared for `action`, if an entry exists.
    pub fn roles_for(&self, action: Action) -> Option<&BTreeSet<Role>> {
        match action {
            Action::Create => self.create.as_ref(),
            Action::Read => self.read.as_ref(),
            Action::Update => self.update.as_ref(),
            Action::Delete => self.delete.as_ref(),
        }
    }

    /// Builder-style setter, mostly for fixtures.
    pub fn allow(mut self, action: Action, roles: impl IntoIterator<Item = Role>) -> Self {
        let set: BTreeSet<Role> = roles.into_iter().collect();
        match action {
            Action::Create => self.create = Some(set),
            Action::Read => self.read = Some(set),
            Action::Update => self.update = Some(set),
            Action::Delete => self.delete = Some(set),
        }
        self
    }
}
