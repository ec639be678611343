//! Filesystem storage backend.
//!
//! One pretty-printed JSON document per entity:
//!
//! ```text
//! <base>/models/<model>.json
//! <base>/records/<model>/<id>.json
//! <base>/users/<id>.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{new_record_id, ModelStore, RecordStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::model_definition::ModelDefinition;
use crate::models::record::Record;
use crate::models::user::User;

/// Filesystem-based storage backend
pub struct FilesystemStore {
    base_path: PathBuf,
    // Serializes every write so check-then-write cycles (name checks, record
    // updates racing deletes) see a stable directory.
    write_lock: Mutex<()>,
}

impl FilesystemStore {
    /// Create new filesystem storage
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn models_dir(&self) -> PathBuf {
        self.base_path.join("models")
    }

    fn records_dir(&self, model: &str) -> PathBuf {
        self.base_path.join("records").join(model)
    }

    fn users_dir(&self) -> PathBuf {
        self.base_path.join("users")
    }
}

/// Names and ids become path segments; anything that could escape the
/// directory is refused.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= 128
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn checked_file(dir: &Path, key: &str) -> Option<PathBuf> {
    is_safe_segment(key).then(|| dir.join(format!("{}.json", key)))
}

fn invalid_key(key: &str) -> AppError {
    AppError::Validation(format!("Invalid storage key '{}'", key))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            AppError::Storage(format!("Corrupt document {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Storage(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Write via a temporary file and rename so readers never see partial JSON.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.sync_all().await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_file(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::Storage(format!(
            "Failed to delete {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn read_dir_json<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        if let Some(item) = read_json(&path).await? {
            items.push(item);
        }
    }
    Ok(items)
}

#[async_trait]
impl ModelStore for FilesystemStore {
    async fn get(&self, name: &str) -> Result<Option<ModelDefinition>> {
        match checked_file(&self.models_dir(), name) {
            Some(path) => read_json(&path).await,
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<ModelDefinition>> {
        read_dir_json(&self.models_dir()).await
    }

    async fn save(&self, model: ModelDefinition) -> Result<()> {
        let path = checked_file(&self.models_dir(), &model.name)
            .ok_or_else(|| invalid_key(&model.name))?;
        let _guard = self.write_lock.lock().await;
        write_json(&path, &model).await
    }

    async fn insert_new(&self, model: ModelDefinition) -> Result<bool> {
        let path = checked_file(&self.models_dir(), &model.name)
            .ok_or_else(|| invalid_key(&model.name))?;
        let _guard = self.write_lock.lock().await;
        if fs::try_exists(&path).await? {
            return Ok(false);
        }
        write_json(&path, &model).await?;
        Ok(true)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let Some(path) = checked_file(&self.models_dir(), name) else {
            return Ok(false);
        };
        let _guard = self.write_lock.lock().await;
        remove_file(&path).await
    }
}

#[async_trait]
impl RecordStore for FilesystemStore {
    async fn list(&self, model: &str) -> Result<Vec<Record>> {
        if !is_safe_segment(model) {
            return Ok(Vec::new());
        }
        read_dir_json(&self.records_dir(model)).await
    }

    async fn get(&self, model: &str, id: &str) -> Result<Option<Record>> {
        if !is_safe_segment(model) {
            return Ok(None);
        }
        match checked_file(&self.records_dir(model), id) {
            Some(path) => read_json(&path).await,
            None => Ok(None),
        }
    }

    async fn create(&self, model: &str, data: Map<String, Value>) -> Result<Record> {
        if !is_safe_segment(model) {
            return Err(invalid_key(model));
        }
        let _guard = self.write_lock.lock().await;
        let dir = self.records_dir(model);
        let (id, path) = loop {
            let id = new_record_id();
            let path = dir.join(format!("{}.json", id));
            if fs::metadata(&path).await.is_err() {
                break (id, path);
            }
        };
        let record = Record::new(id, data);
        write_json(&path, &record).await?;
        Ok(record)
    }

    async fn update(
        &self,
        model: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>> {
        if !is_safe_segment(model) {
            return Ok(None);
        }
        let Some(path) = checked_file(&self.records_dir(model), id) else {
            return Ok(None);
        };
        let _guard = self.write_lock.lock().await;
        let Some(mut record) = read_json::<Record>(&path).await? else {
            return Ok(None);
        };
        record.data = record.merged_with(&patch);
        write_json(&path, &record).await?;
        Ok(Some(record))
    }

    async fn delete(&self, model: &str, id: &str) -> Result<bool> {
        if !is_safe_segment(model) {
            return Ok(false);
        }
        let Some(path) = checked_file(&self.records_dir(model), id) else {
            return Ok(false);
        };
        let _guard = self.write_lock.lock().await;
        remove_file(&path).await
    }

    async fn delete_all(&self, model: &str) -> Result<usize> {
        if !is_safe_segment(model) {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;
        let dir = self.records_dir(model);
        let count = read_dir_json::<Record>(&dir).await?.len();
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(count),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl UserStore for FilesystemStore {
    async fn get(&self, id: &str) -> Result<Option<User>> {
        match checked_file(&self.users_dir(), id) {
            Some(path) => read_json(&path).await,
            None => Ok(None),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users: Vec<User> = read_dir_json(&self.users_dir()).await?;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    async fn list(&self) -> Result<Vec<User>> {
        read_dir_json(&self.users_dir()).await
    }

    async fn create(&self, user: User) -> Result<()> {
        let path = checked_file(&self.users_dir(), &user.id).ok_or_else(|| invalid_key(&user.id))?;
        let _guard = self.write_lock.lock().await;
        if self.find_by_username(&user.username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        write_json(&path, &user).await
    }
}
