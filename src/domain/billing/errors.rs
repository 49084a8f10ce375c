//! Purchase-specific error types.
//!
//! # Error Code Mapping
//!
//! | Error | ErrorCode |
//! |-------|-----------|
//! | PaymentFailed | PAYMENT_FAILED |
//! | PackageNotFound | PACKAGE_NOT_FOUND |
//! | UserNotFound | USER_NOT_FOUND |
//! | SubscriptionNotFound | SUBSCRIPTION_NOT_FOUND |
//! | InvalidState | INVALID_STATE_TRANSITION |
//! | Domain | code of the wrapped error |

use crate::domain::foundation::{
    DomainError, ErrorCode, PackageId, SubscriptionId, TransactionId, UserId,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    /// The processor declined or failed; a FAILED transaction was recorded.
    #[error("{label}: {message}")]
    PaymentFailed {
        label: String,
        message: String,
        transaction_id: TransactionId,
    },

    #[error("Package not found: {0}")]
    PackageNotFound(PackageId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    #[error("Cannot {attempted} in {current} state")]
    InvalidState { current: String, attempted: String },

    /// Collaborator or storage failure.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl PurchaseError {
    pub fn payment_failed(
        label: impl Into<String>,
        message: impl Into<String>,
        transaction_id: TransactionId,
    ) -> Self {
        PurchaseError::PaymentFailed {
            label: label.into(),
            message: message.into(),
            transaction_id,
        }
    }

    pub fn package_not_found(id: PackageId) -> Self {
        PurchaseError::PackageNotFound(id)
    }

    pub fn user_not_found(id: UserId) -> Self {
        PurchaseError::UserNotFound(id)
    }

    pub fn subscription_not_found(id: SubscriptionId) -> Self {
        PurchaseError::SubscriptionNotFound(id)
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        PurchaseError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PurchaseError::PaymentFailed { .. } => ErrorCode::PaymentFailed,
            PurchaseError::PackageNotFound(_) => ErrorCode::PackageNotFound,
            PurchaseError::UserNotFound(_) => ErrorCode::UserNotFound,
            PurchaseError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            PurchaseError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            PurchaseError::Domain(err) => err.code,
        }
    }

    /// Transaction recorded for a failed payment, if any.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            PurchaseError::PaymentFailed { transaction_id, .. } => Some(*transaction_id),
            _ => None,
        }
    }
}

impl From<PurchaseError> for DomainError {
    fn from(err: PurchaseError) -> Self {
        match err {
            PurchaseError::Domain(inner) => inner,
            other => DomainError::new(other.code(), other.to_string()),
        }
    }
}
