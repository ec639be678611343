//! In-memory storage backend.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{new_record_id, ModelStore, RecordStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::model_definition::ModelDefinition;
use crate::models::record::Record;
use crate::models::user::User;

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    models: RwLock<BTreeMap<String, ModelDefinition>>,
    // model name -> record id -> record; BTreeMap keeps listing stable
    records: RwLock<HashMap<String, BTreeMap<String, Record>>>,
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<Option<ModelDefinition>> {
        Ok(self.models.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<ModelDefinition>> {
        Ok(self.models.read().await.values().cloned().collect())
    }

    async fn save(&self, model: ModelDefinition) -> Result<()> {
        self.models.write().await.insert(model.name.clone(), model);
        Ok(())
    }

    async fn insert_new(&self, model: ModelDefinition) -> Result<bool> {
        let mut models = self.models.write().await;
        if models.contains_key(&model.name) {
            return Ok(false);
        }
        models.insert(model.name.clone(), model);
        Ok(true)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.models.write().await.remove(name).is_some())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, model: &str) -> Result<Vec<Record>> {
        Ok(self
            .records
            .read()
            .await
            .get(model)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, model: &str, id: &str) -> Result<Option<Record>> {
        Ok(self
            .records
            .read()
            .await
            .get(model)
            .and_then(|records| records.get(id))
            .cloned())
    }

    async fn create(&self, model: &str, data: Map<String, Value>) -> Result<Record> {
        let mut all = self.records.write().await;
        let records = all.entry(model.to_string()).or_default();
        let mut id = new_record_id();
        while records.contains_key(&id) {
            id = new_record_id();
        }
        let record = Record::new(id.clone(), data);
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        model: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>> {
        let mut all = self.records.write().await;
        let Some(record) = all.get_mut(model).and_then(|records| records.get_mut(id)) else {
            return Ok(None);
        };
        record.data = record.merged_with(&patch);
        Ok(Some(record.clone()))
    }

    async fn delete(&self, model: &str, id: &str) -> Result<bool> {
        Ok(self
            .records
            .write()
            .await
            .get_mut(model)
            .map(|records| records.remove(id).is_some())
            .unwrap_or(false))
    }

    async fn delete_all(&self, model: &str) -> Result<usize> {
        Ok(self
            .records
            .write()
            .await
            .remove(model)
            .map(|records| records.len())
            .unwrap_or(0))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn create(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }
}
