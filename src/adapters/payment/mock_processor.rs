//! Mock payment processor.
//!
//! Configurable `PaymentProcessor` for tests and local embedding. Supports:
//! - Scripted outcomes (approve, decline, transport error) consumed in order
//! - Artificial latency for timeout handling
//! - Call tracking

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::billing::{
    BraintreeTransaction, CreditCardDetails, GatewayPayload, PaymentResult,
};
use crate::ports::{ChargeRequest, PaymentError, PaymentProcessor};

/// Outcome of one scripted charge.
#[derive(Debug, Clone)]
pub enum ScriptedCharge {
    /// Capture the full amount.
    Approve,
    /// Decline with a gateway message.
    Decline(String),
    /// Fail at the transport level.
    Error(PaymentError),
}

/// Mock processor reporting itself as a Braintree gateway.
///
/// Charges with no scripted outcome are approved and paid with a test Visa card.
///
/// # Example
///
/// ```ignore
/// let processor = MockPaymentProcessor::new();
/// processor.push(ScriptedCharge::Decline("Insufficient funds".into()));
///
/// let result = processor.charge(request).await?;
/// assert!(!result.successful);
/// assert_eq!(processor.charge_count(), 1);
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentProcessor {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    script: VecDeque<ScriptedCharge>,
    fallback: Option<ScriptedCharge>,
    latency: Option<Duration>,
    calls: Vec<ChargeRequest>,
    sequence: u64,
}

impl MockPaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A processor that declines every unscripted charge.
    pub fn declining(message: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.state().fallback = Some(ScriptedCharge::Decline(message.into()));
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Queue the outcome of a future charge.
    pub fn push(&self, outcome: ScriptedCharge) {
        self.state().script.push_back(outcome);
    }

    /// Delay every charge by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<ChargeRequest> {
        self.state().calls.clone()
    }

    pub fn charge_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn last_call(&self) -> Option<ChargeRequest> {
        self.state().calls.last().cloned()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().expect("MockPaymentProcessor: state lock poisoned")
    }
}

fn test_card_payload(reference: &str) -> GatewayPayload {
    GatewayPayload::Braintree(BraintreeTransaction {
        id: reference.to_string(),
        status: Some("submitted_for_settlement".to_string()),
        paypal_details: None,
        credit_card_details: Some(CreditCardDetails {
            image_url: None,
            bin: Some("411111".to_string()),
            last4: Some("1111".to_string()),
            card_type: Some("Visa".to_string()),
            expiration_month: Some("12".to_string()),
            expiration_year: Some("2030".to_string()),
        }),
    })
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    fn gateway(&self) -> &str {
        "braintree"
    }

    async fn charge(&self, request: ChargeRequest) -> Result<PaymentResult, PaymentError> {
        let (outcome, latency, sequence) = {
            let mut state = self.state();
            state.calls.push(request.clone());
            state.sequence += 1;
            let outcome = match state.script.pop_front() {
                Some(outcome) => outcome,
                None => state.fallback.clone().unwrap_or(ScriptedCharge::Approve),
            };
            (outcome, state.latency, state.sequence)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let reference = format!("mock_tx_{}", sequence);
        match outcome {
            ScriptedCharge::Approve => Ok(PaymentResult::success(
                request.amount,
                reference.clone(),
                test_card_payload(&reference),
            )),
            ScriptedCharge::Decline(message) => Ok(PaymentResult::declined(
                message,
                test_card_payload(&reference),
            )
            .with_reference(reference)),
            ScriptedCharge::Error(err) => Err(err),
        }
    }
}
