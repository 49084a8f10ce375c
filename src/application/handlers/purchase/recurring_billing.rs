//! RecurringBilling - Charges existing subscriptions.
//!
//! Renewal bills the subscription's current terms and extends it by one
//! period. A frequency switch bills the new plan net of the unused credit
//! of the running period and replaces the subscription.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::billing::{
    Host, Invoice, Plan, PurchaseAttempt, PurchaseError, Subscription, User,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{SubscriptionBilling, SubscriptionRepository, UserRepository};

use super::charge::ChargeExecutor;
use super::dependencies::PurchaseDependencies;
use super::transaction_recorder::TransactionRecorder;

pub struct RecurringBilling {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    charger: ChargeExecutor,
    recorder: TransactionRecorder,
    default_currency: String,
}

impl RecurringBilling {
    pub fn new(deps: &PurchaseDependencies, config: &AppConfig) -> Self {
        Self {
            users: deps.users.clone(),
            subscriptions: deps.subscriptions.clone(),
            charger: ChargeExecutor::new(deps.processor.clone(), config.payment.charge_timeout()),
            recorder: TransactionRecorder::new(
                deps.transactions.clone(),
                deps.events.clone(),
                &config.billing,
                &config.payment,
            ),
            default_currency: config.billing.default_currency.clone(),
        }
    }

    async fn load_user(&self, id: &UserId) -> Result<User, PurchaseError> {
        self.users
            .find(id)
            .await?
            .ok_or_else(|| PurchaseError::user_not_found(id.clone()))
    }

    fn ensure_active(subscription: &Subscription, attempted: &str) -> Result<(), PurchaseError> {
        if subscription.is_active() {
            Ok(())
        } else {
            Err(PurchaseError::invalid_state(
                format!("{:?}", subscription.status),
                attempted,
            ))
        }
    }
}

#[async_trait]
impl SubscriptionBilling for RecurringBilling {
    async fn renew(&self, subscription: &Subscription) -> Result<Invoice, PurchaseError> {
        // 1. Validate
        Self::ensure_active(subscription, "renew")?;
        let user = self.load_user(&subscription.user_id).await?;

        // 2. Charge current terms
        let currency = subscription
            .currency
            .as_deref()
            .unwrap_or(&self.default_currency);
        let payment = self
            .charger
            .charge(&user, subscription.summary, currency, None)
            .await;

        // 3. Extend when the charge cleared
        let mut renewed = subscription.clone();
        if payment.as_ref().map_or(true, |p| p.successful) {
            renewed.extend(subscription.terms(), Timestamp::now())?;
            self.subscriptions.update(&renewed).await?;
            info!(
                subscription_id = %renewed.id,
                next_billing_at = %renewed.next_billing_at,
                "Subscription renewed"
            );
        }

        // 4. Record
        self.recorder
            .record_subscription_charge(&renewed, &user, payment.as_ref(), subscription.summary)
            .await
    }

    async fn switch_frequency(
        &self,
        subscription: &Subscription,
        plan: &Plan,
    ) -> Result<Invoice, PurchaseError> {
        // 1. Validate
        Self::ensure_active(subscription, "switch frequency")?;
        let mut user = self.load_user(&subscription.user_id).await?;

        // 2. Price the new plan; switching never grants a trial
        let mut plan = plan.clone();
        plan.trial_days = 0;
        let terms = PurchaseAttempt::new(
            plan,
            Host::new(subscription.host_id.clone()),
            Some(user.clone()),
            None,
        )
        .subscription_terms();

        let now = Timestamp::now();
        let credit = subscription.unused_credit(now);
        let amount = (terms.summary - credit).max(0);

        // 3. Charge the difference
        let currency = terms
            .currency
            .clone()
            .unwrap_or_else(|| self.default_currency.clone());
        let payment = self.charger.charge(&user, amount, &currency, None).await;

        if let Some(failed) = payment.as_ref().filter(|p| !p.successful) {
            return self
                .recorder
                .record_subscription_charge(subscription, &user, Some(failed), amount)
                .await;
        }

        // 4. Replace the subscription
        let mut previous = subscription.clone();
        previous.cancel(now)?;
        self.subscriptions.update(&previous).await?;

        // One-shot coupons priced into the new terms are used up
        user.remove_coupons(&terms.coupons);
        let leftover = credit - terms.summary;
        if leftover > 0 {
            user.charge_balance(-leftover);
        }
        self.users.save(&user).await?;

        let next = Subscription::start(
            subscription.purchase_id,
            subscription.user_id.clone(),
            subscription.host_id.clone(),
            terms,
            now,
        );
        self.subscriptions.save(&next).await?;
        info!(
            from = %subscription.billing_frequency,
            to = %next.billing_frequency,
            credit,
            charged = amount,
            "Subscription frequency switched"
        );

        // 5. Record
        self.recorder
            .record_subscription_charge(&next, &user, payment.as_ref(), amount)
            .await
    }
}
