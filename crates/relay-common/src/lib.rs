//! # relay-common
//!
//! Shared utilities including configuration, error handling, password hashing, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    hash_password, validate_password_policy, validate_username, verify_password, PasswordService,
};
pub use config::{
    AppConfig, AppSettings, ConfigError, DatabaseSettings, Environment, GatewayConfig,
    ServerConfig, StorageConfig, WebhookConfig,
};
pub use error::AppError;
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
