//! Audit logging service.
//!
//! Subscribes to the event bus and keeps a bounded in-memory trail of every
//! change, plus the version history of each live model definition. Both are
//! capped at the same capacity. It is a pure observer: nothing on the request
//! path waits for it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::audit_log::{AuditEntry, ModelVersion};
use crate::models::model_definition::ModelDefinition;
use crate::services::event_bus::{DomainEvent, EventBus, EventKind};

/// Audit service
pub struct AuditService {
    capacity: usize,
    entries: RwLock<VecDeque<AuditEntry>>,
    versions: RwLock<HashMap<String, Vec<ModelVersion>>>,
}

impl AuditService {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::new()),
            versions: RwLock::new(HashMap::new()),
        }
    }

    /// Consume events from `bus` until it is dropped.
    pub fn spawn(self: Arc<Self>, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.record(&event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Audit subscriber lagged; events were dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("Audit subscriber stopped");
        })
    }

    /// Append one event to the trail (and to model history for model events).
    pub async fn record(&self, event: &DomainEvent) {
        let recorded_at = DateTime::parse_from_rfc3339(&event.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        match event.kind {
            EventKind::ModelCreated | EventKind::ModelUpdated => {
                self.record_version(event, recorded_at).await;
            }
            EventKind::ModelDeleted => {
                self.versions.write().await.remove(&event.entity_id);
            }
            _ => {}
        }

        let entry = AuditEntry {
            id: Uuid::new_v4(),
            action: event.kind.as_str().to_string(),
            model: event.model.clone(),
            entity_id: event.entity_id.clone(),
            actor: event.actor.clone(),
            before: event.before.clone(),
            after: event.after.clone(),
            recorded_at,
        };

        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    async fn record_version(&self, event: &DomainEvent, recorded_at: DateTime<Utc>) {
        let Some(after) = &event.after else {
            return;
        };
        let definition: ModelDefinition = match serde_json::from_value(after.clone()) {
            Ok(definition) => definition,
            Err(e) => {
                tracing::warn!(model = %event.entity_id, error = %e, "Model event without a readable definition");
                return;
            }
        };
        let version = ModelVersion {
            model: definition.name.clone(),
            version: definition.version,
            definition,
            changed_by: event.actor.clone(),
            recorded_at,
        };
        let mut versions = self.versions.write().await;
        let history = versions.entry(version.model.clone()).or_default();
        if history.len() == self.capacity {
            history.remove(0);
        }
        history.push(version);
    }

    /// Most recent entries first.
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Most recent entries for one model first.
    pub async fn for_model(&self, model: &str, limit: usize) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| e.model.as_deref() == Some(model))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Saved versions of a model definition, oldest first. Empty once the
    /// model is deleted.
    pub async fn versions(&self, model: &str) -> Vec<ModelVersion> {
        self.versions
            .read()
            .await
            .get(model)
            .cloned()
            .unwrap_or_default()
    }
}
