//! Transaction repository port (append-only).

use crate::domain::billing::Transaction;
use crate::domain::foundation::{DomainError, PurchaseId, TransactionId};
use async_trait::async_trait;

/// Implementations must never overwrite a settled transaction.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persists a transaction.
    ///
    /// # Errors
    ///
    /// - `TransactionImmutable` if a settled transaction with this id exists
    async fn save(&self, transaction: &Transaction) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError>;

    /// Most recent SUCCESS transaction of the purchase.
    async fn find_latest_successful(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<Option<Transaction>, DomainError>;

    /// All transactions of the purchase, oldest first.
    async fn find_by_purchase(&self, purchase_id: &PurchaseId)
        -> Result<Vec<Transaction>, DomainError>;
}
