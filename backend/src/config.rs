//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Server bind address (host:port)
    pub bind_address: String,

    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,

    /// Storage backend: "memory" or "filesystem"
    pub storage_backend: String,

    /// Root directory (when storage_backend = "filesystem")
    pub storage_path: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token expiry in minutes
    pub jwt_access_token_expiry_minutes: i64,

    /// bcrypt work factor for password hashes
    pub bcrypt_cost: u32,

    /// Username of the admin account created on first boot
    pub admin_username: String,

    /// Password for the bootstrap admin; generated when unset
    pub admin_password: Option<String>,

    /// Capacity of the domain event broadcast channel
    pub event_bus_capacity: usize,

    /// Number of audit entries kept in memory
    pub audit_log_capacity: usize,
}

redacted_debug!(Config {
    show bind_address,
    show log_level,
    show storage_backend,
    show storage_path,
    redact jwt_secret,
    show jwt_access_token_expiry_minutes,
    show bcrypt_cost,
    show admin_username,
    redact_option admin_password,
    show event_bus_capacity,
    show audit_log_capacity,
});

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let storage_backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".into());
        if !matches!(storage_backend.as_str(), "memory" | "filesystem") {
            return Err(AppError::Config(format!(
                "STORAGE_BACKEND must be 'memory' or 'filesystem', got '{}'",
                storage_backend
            )));
        }

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            storage_backend,
            storage_path: env::var("STORAGE_PATH").unwrap_or_else(|_| "./data".into()),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| AppError::Config("JWT_SECRET not set".into()))?,
            jwt_access_token_expiry_minutes: parse_or("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", 60),
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
            event_bus_capacity: parse_or("EVENT_BUS_CAPACITY", 256),
            audit_log_capacity: parse_or("AUDIT_LOG_CAPACITY", 10_000),
        })
    }

    /// Configuration for tests and embedding: in-memory storage, cheap hashing.
    pub fn for_testing(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            log_level: "debug".into(),
            storage_backend: "memory".into(),
            storage_path: "./data".into(),
            jwt_secret: jwt_secret.into(),
            jwt_access_token_expiry_minutes: 60,
            bcrypt_cost: 4,
            admin_username: "admin".into(),
            admin_password: None,
            event_bus_capacity: 64,
            audit_log_capacity: 1_000,
        }
    }
}
