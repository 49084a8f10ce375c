//! Payment outcome and the gateway payload it carries.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Gateway-specific transaction details, tagged by processor family.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "gateway", rename_all = "snake_case")]
pub enum GatewayPayload {
    Braintree(BraintreeTransaction),

    /// A family with no typed payload in this crate.
    Other { name: String, raw: JsonValue },

    #[default]
    Empty,
}

impl GatewayPayload {
    /// Processor family this payload came from.
    pub fn family(&self) -> Option<&str> {
        match self {
            GatewayPayload::Braintree(_) => Some("braintree"),
            GatewayPayload::Other { name, .. } => Some(name),
            GatewayPayload::Empty => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BraintreeTransaction {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub paypal_details: Option<PayPalDetails>,
    #[serde(default)]
    pub credit_card_details: Option<CreditCardDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPalDetails {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub payer_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardDetails {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub bin: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub expiration_month: Option<String>,
    #[serde(default)]
    pub expiration_year: Option<String>,
}

/// Outcome of one charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub successful: bool,

    /// Amount captured in cents. Zero unless successful.
    pub amount: i64,

    pub message: String,

    #[serde(default)]
    pub transaction_reference: Option<String>,

    #[serde(default)]
    pub data: GatewayPayload,
}

impl PaymentResult {
    pub fn success(amount: i64, reference: impl Into<String>, data: GatewayPayload) -> Self {
        Self {
            successful: true,
            amount,
            message: String::new(),
            transaction_reference: Some(reference.into()),
            data,
        }
    }

    pub fn declined(message: impl Into<String>, data: GatewayPayload) -> Self {
        Self {
            successful: false,
            amount: 0,
            message: message.into(),
            transaction_reference: None,
            data,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.transaction_reference = Some(reference.into());
        self
    }

    pub fn is_successful(&self) -> bool {
        self.successful
    }
}
