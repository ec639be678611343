use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Kind of change a [`DomainEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    #[serde(rename = "model.created")]
    ModelCreated,
    #[serde(rename = "model.updated")]
    ModelUpdated,
    #[serde(rename = "model.deleted")]
    ModelDeleted,
    #[serde(rename = "record.created")]
    RecordCreated,
    #[serde(rename = "record.updated")]
    RecordUpdated,
    #[serde(rename = "record.deleted")]
    RecordDeleted,
    #[serde(rename = "user.created")]
    UserCreated,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ModelCreated => "model.created",
            EventKind::ModelUpdated => "model.updated",
            EventKind::ModelDeleted => "model.deleted",
            EventKind::RecordCreated => "record.created",
            EventKind::RecordUpdated => "record.updated",
            EventKind::RecordDeleted => "record.deleted",
            EventKind::UserCreated => "user.created",
        }
    }
}

/// A post-commit notification that an entity changed.
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Model name, record id or user id of the affected entity
    pub entity_id: String,
    /// Model the entity belongs to (records) or is (models)
    pub model: Option<String>,
    /// Id of the user who triggered the change
    pub actor: Option<String>,
    /// State before the change; `None` on create
    pub before: Option<Value>,
    /// State after the change; `None` on delete
    pub after: Option<Value>,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl DomainEvent {
    /// Create a domain event timestamped to now.
    pub fn now(kind: EventKind, entity_id: impl Into<String>, actor: Option<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            model: None,
            actor,
            before: None,
            after: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn before(mut self, before: Value) -> Self {
        self.before = Some(before);
        self
    }

    pub fn after(mut self, after: Value) -> Self {
        self.after = Some(after);
        self
    }
}

/// Broadcast-based event bus for domain events.
///
/// Subscribers receive events via `tokio::sync::broadcast`. If a subscriber
/// falls behind, it receives `RecvError::Lagged` and skips ahead; publishers
/// never wait on subscribers.
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a domain event. If there are no subscribers the event is dropped silently.
    pub fn publish(&self, event: DomainEvent) {
        tracing::debug!(
            event = event.kind.as_str(),
            entity_id = %event.entity_id,
            "Publishing domain event"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to domain events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}
