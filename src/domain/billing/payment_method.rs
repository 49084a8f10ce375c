//! Display-neutral payment method derived from gateway payloads.
//!
//! Each processor family registers a parser; transactions resolve their
//! payment method through the registry instead of knowing gateway shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::GatewayPayload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(rename_all = "camelCase")]
    PaypalAccount {
        image_url: Option<String>,
        email: Option<String>,
        description: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    CreditCard {
        image_url: Option<String>,
        bin: Option<String>,
        last4: Option<String>,
        card_type: Option<String>,
        expiration_month: Option<String>,
        expiration_year: Option<String>,
        description: String,
    },
}

impl PaymentMethod {
    pub fn description(&self) -> Option<&str> {
        match self {
            PaymentMethod::PaypalAccount { description, .. } => description.as_deref(),
            PaymentMethod::CreditCard { description, .. } => Some(description),
        }
    }
}

/// Turns one processor family's payload into a [`PaymentMethod`].
pub trait PaymentMethodParser: Send + Sync {
    /// Returns `None` when the payload carries no recognizable method.
    fn parse(&self, payload: &GatewayPayload) -> Option<PaymentMethod>;
}

/// Parser for Braintree transactions.
#[derive(Debug, Clone)]
pub struct BraintreeMethodParser {
    ending_phrase: String,
}

impl BraintreeMethodParser {
    /// `ending_phrase` joins card type and last digits ("Visa ending in 1111").
    pub fn new(ending_phrase: impl Into<String>) -> Self {
        Self {
            ending_phrase: ending_phrase.into(),
        }
    }
}

impl PaymentMethodParser for BraintreeMethodParser {
    fn parse(&self, payload: &GatewayPayload) -> Option<PaymentMethod> {
        let GatewayPayload::Braintree(tx) = payload else {
            return None;
        };

        if let Some(paypal) = &tx.paypal_details {
            return Some(PaymentMethod::PaypalAccount {
                image_url: paypal.image_url.clone(),
                email: paypal.payer_email.clone(),
                description: paypal.payer_email.clone(),
            });
        }

        let card = tx.credit_card_details.as_ref()?;
        let description = format!(
            "{} {} {}",
            card.card_type.as_deref().unwrap_or_default(),
            self.ending_phrase,
            card.last4.as_deref().unwrap_or_default()
        );
        Some(PaymentMethod::CreditCard {
            image_url: card.image_url.clone(),
            bin: card.bin.clone(),
            last4: card.last4.clone(),
            card_type: card.card_type.clone(),
            expiration_month: card.expiration_month.clone(),
            expiration_year: card.expiration_year.clone(),
            description,
        })
    }
}

/// Parsers keyed by gateway identifier.
#[derive(Clone, Default)]
pub struct PaymentMethodParsers {
    parsers: HashMap<String, Arc<dyn PaymentMethodParser>>,
}

impl PaymentMethodParsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Braintree parser.
    pub fn with_defaults(ending_phrase: impl Into<String>) -> Self {
        let mut parsers = Self::new();
        parsers.register("braintree", Arc::new(BraintreeMethodParser::new(ending_phrase)));
        parsers
    }

    pub fn register(&mut self, gateway: impl Into<String>, parser: Arc<dyn PaymentMethodParser>) {
        self.parsers.insert(gateway.into(), parser);
    }

    /// Parses a payload with the parser of its own family.
    pub fn parse(&self, payload: &GatewayPayload) -> Option<PaymentMethod> {
        let family = payload.family()?;
        self.parsers.get(family)?.parse(payload)
    }
}

impl std::fmt::Debug for PaymentMethodParsers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentMethodParsers")
            .field("gateways", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{BraintreeTransaction, CreditCardDetails, PayPalDetails};

    fn parsers() -> PaymentMethodParsers {
        PaymentMethodParsers::with_defaults("ending in")
    }

    #[test]
    fn paypal_details_become_paypal_account() {
        let payload = GatewayPayload::Braintree(BraintreeTransaction {
            id: "bt_1".to_string(),
            paypal_details: Some(PayPalDetails {
                image_url: Some("https://img/paypal.png".to_string()),
                payer_email: Some("buyer@example.com".to_string()),
            }),
            ..Default::default()
        });

        let method = parsers().parse(&payload).unwrap();
        assert_eq!(method.description(), Some("buyer@example.com"));

        let json = serde_json::to_value(&method).unwrap();
        assert_eq!(json["type"], "paypal_account");
        assert_eq!(json["imageUrl"], "https://img/paypal.png");
        assert_eq!(json["email"], "buyer@example.com");
    }

    #[test]
    fn card_details_become_credit_card() {
        let payload = GatewayPayload::Braintree(BraintreeTransaction {
            id: "bt_2".to_string(),
            credit_card_details: Some(CreditCardDetails {
                card_type: Some("Visa".to_string()),
                last4: Some("1111".to_string()),
                bin: Some("411111".to_string()),
                expiration_month: Some("12".to_string()),
                expiration_year: Some("2030".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });

        let method = parsers().parse(&payload).unwrap();
        assert_eq!(method.description(), Some("Visa ending in 1111"));

        let json = serde_json::to_value(&method).unwrap();
        assert_eq!(json["type"], "credit_card");
        assert_eq!(json["cardType"], "Visa");
        assert_eq!(json["expirationYear"], "2030");
    }

    #[test]
    fn ending_phrase_is_configurable() {
        let parser = BraintreeMethodParser::new("se termine par");
        let payload = GatewayPayload::Braintree(BraintreeTransaction {
            credit_card_details: Some(CreditCardDetails {
                card_type: Some("Visa".to_string()),
                last4: Some("4242".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        let method = parser.parse(&payload).unwrap();
        assert_eq!(method.description(), Some("Visa se termine par 4242"));
    }

    #[test]
    fn payload_without_details_has_no_method() {
        let payload = GatewayPayload::Braintree(BraintreeTransaction::default());
        assert!(parsers().parse(&payload).is_none());
        assert!(parsers().parse(&GatewayPayload::Empty).is_none());
    }

    #[test]
    fn unregistered_family_has_no_method() {
        let payload = GatewayPayload::Other {
            name: "stripe".to_string(),
            raw: serde_json::json!({"card": {"last4": "4242"}}),
        };
        assert!(parsers().parse(&payload).is_none());
    }
}
