//! API module - HTTP handlers and middleware.

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use std::sync::Arc;

use crate::config::Config;
use crate::services::audit_service::AuditService;
use crate::services::auth_service::AuthService;
use crate::services::event_bus::EventBus;
use crate::services::model_service::ModelService;
use crate::services::record_service::RecordService;
use crate::services::user_service::UserService;
use crate::storage::Stores;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub model_service: Arc<ModelService>,
    pub record_service: Arc<RecordService>,
    pub audit_service: Arc<AuditService>,
    pub events: Arc<EventBus>,
}

impl AppState {
    /// Wire every service onto the given stores.
    ///
    /// The audit subscriber is not started here; call
    /// [`AuditService::spawn`] once a runtime is available.
    pub fn new(config: Config, stores: Stores) -> Self {
        let events = Arc::new(EventBus::new(config.event_bus_capacity));
        let auth_service = Arc::new(AuthService::new(stores.users.clone(), &config));
        let user_service = Arc::new(UserService::new(
            stores.users.clone(),
            auth_service.clone(),
            events.clone(),
        ));
        let model_service = Arc::new(ModelService::new(
            stores.models.clone(),
            stores.records.clone(),
            events.clone(),
        ));
        let record_service = Arc::new(RecordService::new(
            stores.models,
            stores.records,
            events.clone(),
        ));
        let audit_service = Arc::new(AuditService::new(config.audit_log_capacity));

        Self {
            config,
            auth_service,
            user_service,
            model_service,
            record_service,
            audit_service,
            events,
        }
    }
}

pub type SharedState = Arc<AppState>;
