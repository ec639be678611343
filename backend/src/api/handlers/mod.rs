//! HTTP request handlers.

pub mod audit;
pub mod auth;
pub mod health;
pub mod models;
pub mod records;
pub mod users;
