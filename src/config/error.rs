//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Telemetry initialization failed: {0}")]
    TelemetryInit(String),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid currency code '{0}', expected three uppercase letters")]
    InvalidCurrency(String),

    #[error("Invalid charge timeout")]
    InvalidTimeout,

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),
}
