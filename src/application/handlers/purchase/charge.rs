//! ChargeExecutor - Sends one charge to the payment processor.
//!
//! Transport errors and timeouts come back as declined payments so the
//! attempt still reaches transaction recording.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::billing::{GatewayPayload, PaymentResult, User};
use crate::ports::{ChargeRequest, PaymentError, PaymentProcessor};

pub struct ChargeExecutor {
    processor: Arc<dyn PaymentProcessor>,
    timeout: Option<Duration>,
}

impl ChargeExecutor {
    pub fn new(processor: Arc<dyn PaymentProcessor>, timeout: Option<Duration>) -> Self {
        Self { processor, timeout }
    }

    /// Identifier of the processor family.
    pub fn gateway(&self) -> &str {
        self.processor.gateway()
    }

    /// Charges `amount` cents to `user`.
    ///
    /// Returns `None` without calling the processor when there is nothing
    /// to charge.
    pub async fn charge(
        &self,
        user: &User,
        amount: i64,
        currency: &str,
        descriptor: Option<String>,
    ) -> Option<PaymentResult> {
        if amount <= 0 {
            return None;
        }

        let request = ChargeRequest {
            user_id: user.id.clone(),
            amount,
            currency: currency.to_string(),
            descriptor,
        };

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.processor.charge(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(PaymentError::timeout(limit.as_secs())),
            },
            None => self.processor.charge(request).await,
        };

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    user_id = %user.id,
                    amount,
                    code = %err.code,
                    retryable = err.retryable,
                    "Charge failed before reaching a decision: {}",
                    err.message
                );
                PaymentResult::declined(err.message, GatewayPayload::Empty)
            }
        };

        info!(
            user_id = %user.id,
            amount,
            successful = result.successful,
            "Charge completed"
        );
        Some(result)
    }
}
