//! TransactionRecorder - Writes the transaction that closes a purchase attempt.
//!
//! Attempts without a payment get an unsaved PENDING transaction on their
//! invoice. Attempts with a payment are settled and persisted; failures
//! publish an event and surface as `PurchaseError::PaymentFailed`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{BillingConfig, PaymentConfig};
use crate::domain::billing::{
    Invoice, PaymentResult, PurchaseAttempt, PurchaseError, PurchaseEvent, Subscription,
    Transaction, TransactionDraft, User,
};
use crate::domain::foundation::{
    DomainError, EventId, PurchaseId, SerializableDomainEvent, Timestamp, UserId,
};
use crate::ports::{EventPublisher, Package, TransactionRepository};

pub struct TransactionRecorder {
    transactions: Arc<dyn TransactionRepository>,
    events: Arc<dyn EventPublisher>,
    processor_label: String,
    default_gateway: String,
}

impl TransactionRecorder {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        events: Arc<dyn EventPublisher>,
        billing: &BillingConfig,
        payment: &PaymentConfig,
    ) -> Self {
        Self {
            transactions,
            events,
            processor_label: billing.processor_label.clone(),
            default_gateway: payment.gateway.clone(),
        }
    }

    /// Records the attempt's outcome and builds its invoice.
    pub async fn create_transaction(
        &self,
        attempt: &PurchaseAttempt,
        package: &dyn Package,
    ) -> Result<Invoice, PurchaseError> {
        // 1. Fill from the attempt
        let mut transaction = Transaction::draft(TransactionDraft {
            name: package.raw_name().to_string(),
            purchase_id: attempt.purchase.as_ref().map(|p| p.id),
            subscription_id: attempt.subscription.as_ref().map(|s| s.id),
            user_id: attempt.user.as_ref().map(|u| u.id.clone()),
            gateway: Some(self.gateway_for(attempt.user.as_ref())),
            price: attempt.price(),
            discount: attempt.discount(),
            currency: attempt.plan.currency.clone(),
            coupons: attempt.discounts().to_vec(),
        });

        // 2. Nothing was charged
        let Some(payment) = attempt.payment.as_ref() else {
            return Ok(Invoice::for_attempt(attempt, transaction));
        };

        // 3. Settle and persist
        transaction.settle(payment, attempt.summary())?;
        self.transactions.save(&transaction).await?;

        // 4. Report failures
        if !payment.successful {
            warn!(
                transaction_id = %transaction.id(),
                package_id = %attempt.plan.package_id,
                host_id = %attempt.host.id,
                "Purchase payment failed: {}",
                payment.message
            );
            self.publish(
                PurchaseEvent::PurchaseFailed {
                    event_id: EventId::new(),
                    purchase_id: transaction.purchase_id(),
                    package_id: attempt.plan.package_id.clone(),
                    host_id: attempt.host.id.clone(),
                    plan_id: attempt.plan.id.clone(),
                    user_id: transaction.user_id().cloned(),
                    transaction_id: transaction.id(),
                    amount: attempt.summary(),
                    message: payment.message.clone(),
                    occurred_at: Timestamp::now(),
                },
                transaction.user_id(),
                &transaction,
            )
            .await;
            return Err(self.payment_failed(payment, &transaction));
        }

        info!(
            transaction_id = %transaction.id(),
            summary = transaction.summary(),
            "Purchase transaction recorded"
        );
        Ok(Invoice::for_attempt(attempt, transaction))
    }

    /// Records a charge against an existing subscription.
    ///
    /// `billed` is the amount sent to the processor, kept on failed
    /// transactions.
    pub async fn record_subscription_charge(
        &self,
        subscription: &Subscription,
        user: &User,
        payment: Option<&PaymentResult>,
        billed: i64,
    ) -> Result<Invoice, PurchaseError> {
        let mut transaction =
            Transaction::from_subscription(subscription, Some(self.gateway_for(Some(user))));

        let Some(payment) = payment else {
            return Ok(Invoice::for_subscription(subscription, transaction));
        };

        transaction.settle(payment, billed)?;
        self.transactions.save(&transaction).await?;

        if !payment.successful {
            warn!(
                transaction_id = %transaction.id(),
                subscription_id = %subscription.id,
                "Subscription charge failed: {}",
                payment.message
            );
            self.publish(
                PurchaseEvent::RenewalFailed {
                    event_id: EventId::new(),
                    subscription_id: subscription.id,
                    purchase_id: subscription.purchase_id,
                    transaction_id: transaction.id(),
                    amount: billed,
                    message: payment.message.clone(),
                    occurred_at: Timestamp::now(),
                },
                Some(&subscription.user_id),
                &transaction,
            )
            .await;
            return Err(self.payment_failed(payment, &transaction));
        }

        info!(
            transaction_id = %transaction.id(),
            subscription_id = %subscription.id,
            summary = transaction.summary(),
            "Subscription transaction recorded"
        );
        Ok(Invoice::for_subscription(subscription, transaction))
    }

    /// Most recent SUCCESS transaction of the purchase, or an empty placeholder.
    pub async fn latest_successful(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<Transaction, DomainError> {
        Ok(self
            .transactions
            .find_latest_successful(purchase_id)
            .await?
            .unwrap_or_else(Transaction::empty))
    }

    fn gateway_for(&self, user: Option<&User>) -> String {
        user.and_then(|u| u.payment_gateway.clone())
            .unwrap_or_else(|| self.default_gateway.clone())
    }

    fn payment_failed(&self, payment: &PaymentResult, transaction: &Transaction) -> PurchaseError {
        PurchaseError::payment_failed(
            self.processor_label.clone(),
            payment.message.clone(),
            transaction.id(),
        )
    }

    /// Publishes `event` tagged with its buyer and correlated by transaction.
    async fn publish(
        &self,
        event: PurchaseEvent,
        user_id: Option<&UserId>,
        transaction: &Transaction,
    ) {
        let mut envelope = match event.to_envelope() {
            Ok(envelope) => envelope.with_correlation_id(transaction.id().to_string()),
            Err(e) => {
                warn!(error = %e, "Failed to serialize billing event");
                return;
            }
        };
        if let Some(user_id) = user_id {
            envelope = envelope.with_user_id(user_id.as_str());
        }
        let event_type = envelope.event_type.clone();
        if let Err(e) = self.events.publish(envelope).await {
            warn!(event_type = %event_type, error = %e, "Dropped billing event");
        }
    }
}
