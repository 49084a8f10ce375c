use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, ErrorCode, PurchaseId, SubscriptionId};
use crate::ports::SubscriptionRepository;

/// In-memory subscription store, oldest first.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored subscription.
    pub async fn all(&self) -> Vec<Subscription> {
        self.subscriptions.read().await.clone()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;

        if subscription.is_active()
            && subscriptions
                .iter()
                .any(|s| s.purchase_id == subscription.purchase_id && s.is_active())
        {
            return Err(DomainError::validation(
                "purchase_id",
                format!(
                    "Purchase {} already has an active subscription",
                    subscription.purchase_id
                ),
            ));
        }

        subscriptions.push(subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        let slot = subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription not found: {}", subscription.id),
                )
            })?;
        *slot = subscription.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .iter()
            .find(|s| &s.id == id)
            .cloned())
    }

    async fn find_active_by_purchase(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .iter()
            .find(|s| &s.purchase_id == purchase_id && s.is_active())
            .cloned())
    }

    async fn find_by_purchase(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|s| &s.purchase_id == purchase_id)
            .cloned()
            .collect())
    }
}
