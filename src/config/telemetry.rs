//! Telemetry configuration

use serde::Deserialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use super::error::{ConfigError, ValidationError};

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Default filter when `RUST_LOG` is unset; a level or filter directives
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TelemetryConfig {
    /// Validate telemetry configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let level = self.log_level.trim();
        let is_directive = level.contains('=') || level.contains(',');
        if !is_directive && !LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            return Err(ValidationError::InvalidLogLevel(self.log_level.clone()));
        }
        Ok(())
    }

    /// Installs the global tracing subscriber.
    ///
    /// `RUST_LOG` takes precedence over `log_level`.
    pub fn init(&self) -> Result<(), ConfigError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.log_level)
                .map_err(|e| ConfigError::TelemetryInit(e.to_string()))?,
        };

        let registry = tracing_subscriber::registry().with(filter);
        let result = if self.json {
            registry.with(fmt::layer().json()).try_init()
        } else {
            registry.with(fmt::layer().with_target(false)).try_init()
        };
        result.map_err(|e| ConfigError::TelemetryInit(e.to_string()))
    }
}
