//! Payment processor port for charging buyers.
//!
//! Defines the contract for payment gateway integrations (e.g., Braintree).
//! The engine only charges; customer vaulting and webhooks live elsewhere.
//!
//! # Design
//!
//! - **Gateway agnostic**: the outcome is a `PaymentResult` carrying a tagged
//!   gateway payload
//! - **Declines are results**: a declined card is `Ok` with `successful = false`;
//!   `Err` is reserved for transport and provider failures
//! - **Never retried by the engine**: callers decide on retries

use crate::domain::billing::PaymentResult;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Identifier of the gateway family (e.g. "braintree").
    fn gateway(&self) -> &str;

    /// Charges the buyer's payment method on file.
    async fn charge(&self, request: ChargeRequest) -> Result<PaymentResult, PaymentError>;
}

/// Request to charge a buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub user_id: UserId,

    /// Amount in cents. Always positive; zero amounts are never charged.
    pub amount: i64,

    pub currency: String,

    /// Statement descriptor supplied by the package.
    pub descriptor: Option<String>,
}

/// Error from the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn timeout(secs: u64) -> Self {
        Self::new(
            PaymentErrorCode::Timeout,
            format!("Charge timed out after {}s", secs),
        )
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::CardDeclined | PaymentErrorCode::InsufficientFunds => {
                ErrorCode::PaymentRequired
            }
            _ => ErrorCode::ExternalServiceError,
        };

        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Card was declined.
    CardDeclined,

    /// Insufficient funds.
    InsufficientFunds,

    /// No response within the configured charge timeout.
    Timeout,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::Timeout
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::CardDeclined => "card_declined",
            PaymentErrorCode::InsufficientFunds => "insufficient_funds",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
