//! SubscriptionManager - Keeps a purchase's subscription in step with its
//! latest attempt.
//!
//! A purchase has at most one active subscription. Subscribing with the
//! same billing frequency extends it; a different frequency cancels it and
//! starts a new one.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::{PurchaseAttempt, PurchaseError, Subscription};
use crate::domain::foundation::{DomainError, PurchaseId, Timestamp};
use crate::ports::SubscriptionRepository;

pub struct SubscriptionManager {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl SubscriptionManager {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    /// Creates, extends or completes the subscription for the attempt's
    /// purchase and records it on the attempt.
    ///
    /// After a failed payment nothing is mutated; a recurring attempt only
    /// picks up the purchase's existing subscription.
    pub async fn process_subscription(
        &self,
        attempt: &mut PurchaseAttempt,
    ) -> Result<Option<Subscription>, PurchaseError> {
        let Some(purchase_id) = attempt.purchase.as_ref().map(|p| p.id) else {
            return Ok(attempt.subscription.clone());
        };

        if attempt.payment_cleared() {
            if attempt.plan.is_recurring {
                let subscription = self.subscribe(purchase_id, attempt).await?;
                attempt.subscription = Some(subscription);
            } else {
                self.unsubscribe(&purchase_id, attempt.started_at).await?;
            }
        } else if attempt.plan.is_recurring && attempt.subscription.is_none() {
            attempt.subscription = self.current(&purchase_id).await?;
        }

        Ok(attempt.subscription.clone())
    }

    async fn subscribe(
        &self,
        purchase_id: PurchaseId,
        attempt: &PurchaseAttempt,
    ) -> Result<Subscription, PurchaseError> {
        let now = Timestamp::now();
        let terms = attempt.subscription_terms();

        if let Some(mut active) = self.subscriptions.find_active_by_purchase(&purchase_id).await? {
            if active.billing_frequency == attempt.plan.billing_frequency {
                active.extend(terms, now)?;
                self.subscriptions.update(&active).await?;
                info!(
                    subscription_id = %active.id,
                    next_billing_at = %active.next_billing_at,
                    "Subscription extended"
                );
                return Ok(active);
            }

            active.cancel(now)?;
            self.subscriptions.update(&active).await?;
        }

        let user = attempt
            .user
            .as_ref()
            .ok_or_else(|| PurchaseError::invalid_state("anonymous", "subscribe"))?;
        let subscription = Subscription::start(
            purchase_id,
            user.id.clone(),
            attempt.host.id.clone(),
            terms,
            now,
        );
        self.subscriptions.save(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            purchase_id = %purchase_id,
            frequency = %subscription.billing_frequency,
            "Subscription started"
        );
        Ok(subscription)
    }

    /// Completes the purchase's active subscription, if any.
    pub async fn unsubscribe(
        &self,
        purchase_id: &PurchaseId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        let Some(mut active) = self.subscriptions.find_active_by_purchase(purchase_id).await? else {
            return Ok(None);
        };
        active.complete(now)?;
        self.subscriptions.update(&active).await?;
        info!(subscription_id = %active.id, "Subscription completed");
        Ok(Some(active))
    }

    /// Active subscription, or the most recent one.
    async fn current(&self, purchase_id: &PurchaseId) -> Result<Option<Subscription>, DomainError> {
        if let Some(active) = self.subscriptions.find_active_by_purchase(purchase_id).await? {
            return Ok(Some(active));
        }
        let mut all = self.subscriptions.find_by_purchase(purchase_id).await?;
        all.sort_by_key(|s| s.created_at);
        Ok(all.pop())
    }
}
