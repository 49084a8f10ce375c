//! Billing configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::PaymentMethodParsers;

/// Currency and buyer-facing wording used by the purchase flow
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Currency for plans and transactions that don't name one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Prefix of payment failure messages ("Payment processor: Declined")
    #[serde(default = "default_processor_label")]
    pub processor_label: String,

    /// Joins card type and last digits in payment method descriptions
    #[serde(default = "default_card_ending_phrase")]
    pub card_ending_phrase: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            processor_label: default_processor_label(),
            card_ending_phrase: default_card_ending_phrase(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_processor_label() -> String {
    "Payment processor".to_string()
}

fn default_card_ending_phrase() -> String {
    "ending in".to_string()
}

impl BillingConfig {
    /// Parser registry for the built-in gateways, using the configured wording.
    pub fn payment_method_parsers(&self) -> PaymentMethodParsers {
        PaymentMethodParsers::with_defaults(self.card_ending_phrase.clone())
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let currency = &self.default_currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency(currency.clone()));
        }
        if self.processor_label.trim().is_empty() {
            return Err(ValidationError::MissingRequired("BILLING__PROCESSOR_LABEL"));
        }
        if self.card_ending_phrase.trim().is_empty() {
            return Err(ValidationError::MissingRequired("BILLING__CARD_ENDING_PHRASE"));
        }
        Ok(())
    }
}
