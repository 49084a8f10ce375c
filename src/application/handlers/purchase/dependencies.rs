//! Ports shared by the purchase handlers.

use std::sync::Arc;

use crate::ports::{
    EventPublisher, PackageDirectory, PaymentProcessor, SubscriptionRepository,
    TransactionRepository, UserRepository,
};

/// Adapters a purchase flow runs against.
#[derive(Clone)]
pub struct PurchaseDependencies {
    pub packages: Arc<dyn PackageDirectory>,
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub events: Arc<dyn EventPublisher>,
}
