//! Subscription billing port - charges on existing subscriptions.
//!
//! The purchase orchestrator hands renewals and frequency switches to this
//! port instead of running a new sale.

use crate::domain::billing::{Invoice, Plan, PurchaseError, Subscription};
use async_trait::async_trait;

#[async_trait]
pub trait SubscriptionBilling: Send + Sync {
    /// Charges the next period at the subscription's current terms.
    async fn renew(&self, subscription: &Subscription) -> Result<Invoice, PurchaseError>;

    /// Moves the subscription to `plan`'s billing frequency and price.
    async fn switch_frequency(
        &self,
        subscription: &Subscription,
        plan: &Plan,
    ) -> Result<Invoice, PurchaseError>;
}
