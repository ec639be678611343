//! Storage backends for model definitions, records and users.
//!
//! The services only see the traits below; which backend sits behind them is
//! chosen once at startup from [`Config::storage_backend`].

pub mod filesystem;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::model_definition::ModelDefinition;
use crate::models::record::Record;
use crate::models::user::User;

/// Persistence of model definitions, keyed by model name.
#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<ModelDefinition>>;

    /// All definitions, ordered by name.
    async fn list(&self) -> Result<Vec<ModelDefinition>>;

    /// Insert or replace by name.
    async fn save(&self, model: ModelDefinition) -> Result<()>;

    /// Insert only if no definition has this name yet. Returns whether it
    /// was inserted. The check and the insert happen atomically.
    async fn insert_new(&self, model: ModelDefinition) -> Result<bool>;

    /// Returns whether a definition was removed.
    async fn delete(&self, name: &str) -> Result<bool>;
}

/// Persistence of dynamic records. No query semantics: whole records only.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, model: &str) -> Result<Vec<Record>>;

    async fn get(&self, model: &str, id: &str) -> Result<Option<Record>>;

    /// Store `data` under a freshly assigned id.
    async fn create(&self, model: &str, data: Map<String, Value>) -> Result<Record>;

    /// Overwrite the keys present in `patch`. `None` if the record is gone.
    async fn update(&self, model: &str, id: &str, patch: Map<String, Value>)
        -> Result<Option<Record>>;

    async fn delete(&self, model: &str, id: &str) -> Result<bool>;

    /// Remove every record of `model`, returning how many were removed.
    async fn delete_all(&self, model: &str) -> Result<usize>;
}

/// Persistence of user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn list(&self) -> Result<Vec<User>>;

    /// Fails with [`AppError::Conflict`] if the username is taken.
    async fn create(&self, user: User) -> Result<()>;
}

/// The three stores used by the application.
#[derive(Clone)]
pub struct Stores {
    pub models: Arc<dyn ModelStore>,
    pub records: Arc<dyn RecordStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// All three stores backed by one in-memory instance.
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            models: store.clone(),
            records: store.clone(),
            users: store,
        }
    }

    /// All three stores backed by JSON files under `base_path`.
    pub fn filesystem(base_path: impl Into<std::path::PathBuf>) -> Self {
        let store = Arc::new(filesystem::FilesystemStore::new(base_path));
        Self {
            models: store.clone(),
            records: store.clone(),
            users: store,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        match config.storage_backend.as_str() {
            "memory" => Ok(Self::in_memory()),
            "filesystem" => Ok(Self::filesystem(&config.storage_path)),
            other => Err(AppError::Config(format!(
                "Unknown STORAGE_BACKEND '{}', expected 'memory' or 'filesystem'",
                other
            ))),
        }
    }
}

/// Fresh record id.
pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
