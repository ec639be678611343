//! Formwork - Backend Library
//!
//! Low-code data platform: administrators define models at runtime and every
//! record operation is checked against the model's role rules, its owner
//! field and its field validation rules.

#[macro_use]
mod macros;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
