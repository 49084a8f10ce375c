use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::Transaction;
use crate::domain::foundation::{DomainError, ErrorCode, PurchaseId, TransactionId};
use crate::ports::TransactionRepository;

/// Append-only in-memory transaction log.
#[derive(Default)]
pub struct InMemoryTransactionRepository {
    transactions: RwLock<Vec<Transaction>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.transactions.read().await.len()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn save(&self, transaction: &Transaction) -> Result<(), DomainError> {
        let mut transactions = self.transactions.write().await;

        match transactions.iter_mut().find(|t| t.id() == transaction.id()) {
            Some(existing) if existing.is_settled() => Err(DomainError::new(
                ErrorCode::TransactionImmutable,
                format!("Transaction {} is already settled", transaction.id()),
            )),
            Some(existing) => {
                *existing = transaction.clone();
                Ok(())
            }
            None => {
                transactions.push(transaction.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .find(|t| &t.id() == id)
            .cloned())
    }

    async fn find_latest_successful(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<Option<Transaction>, DomainError> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .rev()
            .find(|t| t.purchase_id().as_ref() == Some(purchase_id) && t.is_successful())
            .cloned())
    }

    async fn find_by_purchase(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<Vec<Transaction>, DomainError> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.purchase_id().as_ref() == Some(purchase_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{GatewayPayload, PaymentResult, TransactionDraft};

    fn transaction(purchase_id: PurchaseId, successful: bool, amount: i64) -> Transaction {
        let mut tx = Transaction::draft(TransactionDraft {
            purchase_id: Some(purchase_id),
            price: amount,
            ..Default::default()
        });
        let payment = if successful {
            PaymentResult::success(amount, "ref", GatewayPayload::Empty)
        } else {
            PaymentResult::declined("declined", GatewayPayload::Empty)
        };
        tx.settle(&payment, amount).unwrap();
        tx
    }

    #[tokio::test]
    async fn settled_transaction_cannot_be_overwritten() {
        let repo = InMemoryTransactionRepository::new();
        let tx = transaction(PurchaseId::new(), true, 500);

        repo.save(&tx).await.unwrap();
        let err = repo.save(&tx).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::TransactionImmutable);
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn latest_successful_skips_failures() {
        let repo = InMemoryTransactionRepository::new();
        let purchase_id = PurchaseId::new();

        repo.save(&transaction(purchase_id, true, 100)).await.unwrap();
        repo.save(&transaction(purchase_id, true, 200)).await.unwrap();
        repo.save(&transaction(purchase_id, false, 300)).await.unwrap();
        repo.save(&transaction(PurchaseId::new(), true, 400)).await.unwrap();

        let latest = repo.find_latest_successful(&purchase_id).await.unwrap().unwrap();
        assert_eq!(latest.summary(), 200);
        assert_eq!(repo.find_by_purchase(&purchase_id).await.unwrap().len(), 3);
    }
}
