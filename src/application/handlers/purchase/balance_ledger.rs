//! BalanceLedger - Debits purchases from the buyer's account balance.
//!
//! A replaced subscription is cancelled here and the unused part of its
//! paid period is credited against the new price. Balances never go below
//! zero and adjustments are not rolled back when the charge later fails.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::{PurchaseAttempt, Subscription};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{SubscriptionRepository, UserRepository};

pub struct BalanceLedger {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl BalanceLedger {
    pub fn new(
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            users,
            subscriptions,
        }
    }

    /// Applies the attempt's price to the buyer's balance.
    ///
    /// Skipped for trials.
    pub async fn refund_to_user_balance(
        &self,
        attempt: &mut PurchaseAttempt,
    ) -> Result<(), DomainError> {
        if attempt.has_trial() {
            return Ok(());
        }

        let now = attempt.started_at;
        let mut price = attempt.price() - attempt.coupon_discount();
        if let Some(previous) = attempt.previous_subscription.as_mut() {
            price = self.cancel_and_refund(previous, price, now).await?;
        }

        let Some(user) = attempt.user.as_mut() else {
            return Ok(());
        };
        user.charge_balance(price);
        self.users.save(user).await?;

        info!(user_id = %user.id, debited = price, balance = user.balance, "Balance adjusted");
        Ok(())
    }

    /// Cancels `subscription` and returns `price` net of its unused credit.
    ///
    /// The result is negative when the credit exceeds the price.
    pub async fn cancel_and_refund(
        &self,
        subscription: &mut Subscription,
        price: i64,
        now: Timestamp,
    ) -> Result<i64, DomainError> {
        let credit = subscription.unused_credit(now);
        if subscription.is_active() {
            subscription.cancel(now)?;
            self.subscriptions.update(subscription).await?;
            info!(
                subscription_id = %subscription.id,
                credit,
                "Replaced subscription cancelled"
            );
        }
        Ok(price - credit)
    }

    /// Cancels the replaced subscription of a reactivation and credits
    /// its unused period to the buyer.
    pub async fn release_previous_subscription(
        &self,
        attempt: &mut PurchaseAttempt,
    ) -> Result<(), DomainError> {
        let now = attempt.started_at;
        let Some(previous) = attempt.previous_subscription.as_mut() else {
            return Ok(());
        };
        let remainder = self.cancel_and_refund(previous, 0, now).await?;

        if remainder != 0 {
            if let Some(user) = attempt.user.as_mut() {
                user.charge_balance(remainder);
                self.users.save(user).await?;
            }
        }
        Ok(())
    }
}
