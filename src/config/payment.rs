//! Payment configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment processor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Gateway recorded on transactions when the buyer has none on file
    #[serde(default = "default_gateway")]
    pub gateway: String,

    /// Upper bound on a single charge; unbounded when unset
    #[serde(default)]
    pub charge_timeout_secs: Option<u64>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway: default_gateway(),
            charge_timeout_secs: None,
        }
    }
}

fn default_gateway() -> String {
    "braintree".to_string()
}

impl PaymentConfig {
    pub fn charge_timeout(&self) -> Option<Duration> {
        self.charge_timeout_secs.map(Duration::from_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.gateway.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__GATEWAY"));
        }
        if self.charge_timeout_secs == Some(0) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}
