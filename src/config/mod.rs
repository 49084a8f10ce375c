//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `PURCHASE_ENGINE` prefix and nested values use double underscores as separators.
//! Every section has defaults, so an empty environment yields a usable config.
//!
//! # Example
//!
//! ```no_run
//! use purchase_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! config.telemetry.init().expect("Failed to install tracing");
//! ```

mod billing;
mod error;
mod payment;
mod telemetry;

pub use billing::BillingConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use telemetry::TelemetryConfig;

use serde::Deserialize;

/// Root configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Currency and buyer-facing wording
    #[serde(default)]
    pub billing: BillingConfig,

    /// Payment processor settings
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PURCHASE_ENGINE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PURCHASE_ENGINE__BILLING__DEFAULT_CURRENCY=EUR` -> `billing.default_currency = "EUR"`
    /// - `PURCHASE_ENGINE__PAYMENT__CHARGE_TIMEOUT_SECS=30` -> `payment.charge_timeout_secs = 30`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PURCHASE_ENGINE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.billing.validate()?;
        self.payment.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}
