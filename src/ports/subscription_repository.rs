//! Subscription repository port.
//!
//! # Design
//!
//! - **One active per purchase**: `save` rejects a second active subscription
//!   for the same purchase
//! - **History kept**: ended subscriptions stay queryable by purchase

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, PurchaseId, SubscriptionId};
use async_trait::async_trait;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the purchase already has an active subscription
    /// - `DatabaseError` on persistence failure
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if it was never saved
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    async fn find_active_by_purchase(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// All subscriptions of a purchase, oldest first.
    async fn find_by_purchase(&self, purchase_id: &PurchaseId)
        -> Result<Vec<Subscription>, DomainError>;
}
