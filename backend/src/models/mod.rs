//! Domain models.

pub mod audit_log;
pub mod model_definition;
pub mod record;
pub mod role;
pub mod user;
