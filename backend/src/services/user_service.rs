//! User account management.

use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::role::Role;
use crate::models::user::{Principal, User};
use crate::services::auth_service::AuthService;
use crate::services::event_bus::{DomainEvent, EventBus, EventKind};
use crate::services::permission_service::require_role;
use crate::storage::UserStore;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Request to create a user
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// User service
pub struct UserService {
    users: Arc<dyn UserStore>,
    auth: Arc<AuthService>,
    events: Arc<EventBus>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, auth: Arc<AuthService>, events: Arc<EventBus>) -> Self {
        Self {
            users,
            auth,
            events,
        }
    }

    /// Create a user. Only admins may create accounts.
    pub async fn create(&self, actor: &Principal, request: CreateUserRequest) -> Result<User> {
        require_role(actor, Role::Admin)?;
        let user = self.insert(request, Some(actor.id.clone())).await?;
        tracing::info!(user_id = %user.id, role = %user.role, created_by = %actor.id, "User created");
        Ok(user)
    }

    pub async fn list(&self, actor: &Principal) -> Result<Vec<User>> {
        require_role(actor, Role::Admin)?;
        self.users.list().await
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", id)))
    }

    /// Create the first admin account when no users exist yet.
    ///
    /// Returns the generated password when one had to be made up, so the
    /// caller can show it once.
    pub async fn ensure_bootstrap_admin(
        &self,
        username: &str,
        password: Option<String>,
    ) -> Result<Option<String>> {
        if !self.users.list().await?.is_empty() {
            return Ok(None);
        }

        let (password, generated) = match password {
            Some(p) => (p, false),
            None => (generate_password(), true),
        };

        let user = self
            .insert(
                CreateUserRequest {
                    username: username.to_string(),
                    password: password.clone(),
                    role: Role::Admin,
                },
                None,
            )
            .await?;
        tracing::info!(user_id = %user.id, username, "Bootstrap admin account created");

        Ok(generated.then_some(password))
    }

    async fn insert(&self, request: CreateUserRequest, actor: Option<String>) -> Result<User> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username must not be empty".to_string()));
        }
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: self.auth.hash_password(&request.password)?,
            role: request.role,
            created_at: Utc::now(),
        };
        self.users.create(user.clone()).await?;

        self.events.publish(
            DomainEvent::now(EventKind::UserCreated, user.id.clone(), actor).after(
                serde_json::json!({"username": user.username, "role": user.role}),
            ),
        );
        Ok(user)
    }
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}
