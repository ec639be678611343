//! Business logic services.

pub mod audit_service;
pub mod auth_service;
pub mod event_bus;
pub mod model_service;
pub mod permission_service;
pub mod record_service;
pub mod user_service;
pub mod validation_service;
