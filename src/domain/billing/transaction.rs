//! Transaction - immutable audit record of one purchase or billing attempt.
//!
//! # Design Decisions
//!
//! - **Append-only**: a transaction is settled exactly once; settled records
//!   reject every further change and repositories refuse to overwrite them
//! - **Summary is what was captured**: zero while pending
//! - **Payload hidden**: the raw gateway payload is not serialized

use crate::domain::foundation::{
    DomainError, ErrorCode, PurchaseId, StateMachine, SubscriptionId, Timestamp, TransactionId,
    UserId,
};
use serde::{Deserialize, Serialize};

use super::{Coupon, GatewayPayload, PaymentMethod, PaymentMethodParsers, PaymentResult, Subscription};

/// Settlement status, stored as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TransactionStatus {
    Pending = 0,
    Success = 1,
    Failed = 2,
}

impl From<TransactionStatus> for u8 {
    fn from(status: TransactionStatus) -> Self {
        status as u8
    }
}

impl TryFrom<u8> for TransactionStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TransactionStatus::Pending),
            1 => Ok(TransactionStatus::Success),
            2 => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status {}", other)),
        }
    }
}

impl StateMachine for TransactionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TransactionStatus::*;
        matches!((self, target), (Pending, Success) | (Pending, Failed))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Pending => vec![Success, Failed],
            Success | Failed => vec![],
        }
    }
}

/// Fields known before the payment outcome.
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    pub name: String,
    pub purchase_id: Option<PurchaseId>,
    pub subscription_id: Option<SubscriptionId>,
    pub user_id: Option<UserId>,
    pub gateway: Option<String>,
    pub price: i64,
    pub discount: i64,
    pub currency: Option<String>,
    pub coupons: Vec<Coupon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    name: String,
    purchase_id: Option<PurchaseId>,
    subscription_id: Option<SubscriptionId>,
    user_id: Option<UserId>,
    gateway: Option<String>,
    price: i64,
    discount: i64,
    summary: i64,
    currency: Option<String>,
    coupons: Vec<Coupon>,
    #[serde(skip_serializing, default)]
    data: GatewayPayload,
    reference: Option<String>,
    message: Option<String>,
    status: TransactionStatus,
    created_at: Timestamp,
}

impl Transaction {
    /// Pending transaction with nothing captured.
    pub fn draft(draft: TransactionDraft) -> Self {
        Self {
            id: TransactionId::new(),
            name: draft.name,
            purchase_id: draft.purchase_id,
            subscription_id: draft.subscription_id,
            user_id: draft.user_id,
            gateway: draft.gateway,
            price: draft.price,
            discount: draft.discount,
            summary: 0,
            currency: draft.currency,
            coupons: draft.coupons,
            data: GatewayPayload::Empty,
            reference: None,
            message: None,
            status: TransactionStatus::Pending,
            created_at: Timestamp::now(),
        }
    }

    /// Placeholder for invoices that have no transaction to show.
    pub fn empty() -> Self {
        Self::draft(TransactionDraft::default())
    }

    /// Pending transaction billing a subscription's current terms.
    pub fn from_subscription(subscription: &Subscription, gateway: Option<String>) -> Self {
        Self::draft(TransactionDraft {
            name: subscription.plan.name.clone(),
            purchase_id: Some(subscription.purchase_id),
            subscription_id: Some(subscription.id),
            user_id: Some(subscription.user_id.clone()),
            gateway,
            price: subscription.price,
            discount: subscription.discount,
            currency: subscription.currency.clone(),
            coupons: subscription.coupons.clone(),
        })
    }

    /// Records the payment outcome.
    ///
    /// `billed_summary` is kept as the summary of a failed attempt.
    ///
    /// # Errors
    ///
    /// Returns `TransactionImmutable` if the transaction is already settled.
    pub fn settle(&mut self, payment: &PaymentResult, billed_summary: i64) -> Result<(), DomainError> {
        let target = if payment.successful {
            TransactionStatus::Success
        } else {
            TransactionStatus::Failed
        };
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::TransactionImmutable,
                format!("Transaction {} is already settled", self.id),
            )
        })?;

        self.summary = if payment.successful {
            payment.amount
        } else {
            billed_summary
        };
        self.data = payment.data.clone();
        self.reference = payment.transaction_reference.clone();
        self.message = (!payment.message.is_empty()).then(|| payment.message.clone());
        Ok(())
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_successful(&self) -> bool {
        self.status == TransactionStatus::Success
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Raw package name recorded at purchase time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded name, or `fallback` when none was recorded.
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.name.trim().is_empty() {
            fallback
        } else {
            &self.name
        }
    }

    pub fn purchase_id(&self) -> Option<PurchaseId> {
        self.purchase_id
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription_id
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn gateway(&self) -> Option<&str> {
        self.gateway.as_deref()
    }

    pub fn price(&self) -> i64 {
        self.price
    }

    pub fn discount(&self) -> i64 {
        self.discount
    }

    /// Amount actually captured.
    pub fn summary(&self) -> i64 {
        self.summary
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn currency_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.currency.as_deref().unwrap_or(default)
    }

    pub fn coupons(&self) -> &[Coupon] {
        &self.coupons
    }

    pub fn data(&self) -> &GatewayPayload {
        &self.data
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Payment method used, derived from the gateway payload.
    pub fn payment_method(&self, parsers: &PaymentMethodParsers) -> Option<PaymentMethod> {
        parsers.parse(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{BraintreeTransaction, CreditCardDetails};

    fn draft() -> Transaction {
        Transaction::draft(TransactionDraft {
            name: "SEO Toolkit".to_string(),
            purchase_id: Some(PurchaseId::new()),
            user_id: Some(UserId::new("user-1").unwrap()),
            gateway: Some("braintree".to_string()),
            price: 1_000,
            discount: 200,
            ..Default::default()
        })
    }

    #[test]
    fn draft_is_pending_with_zero_summary() {
        let tx = draft();
        assert_eq!(tx.status(), TransactionStatus::Pending);
        assert_eq!(tx.summary(), 0);
        assert!(!tx.is_settled());
    }

    #[test]
    fn settle_success_records_captured_amount() {
        let mut tx = draft();
        let payment = PaymentResult::success(800, "ref-1", GatewayPayload::Empty);
        tx.settle(&payment, 800).unwrap();

        assert_eq!(tx.status(), TransactionStatus::Success);
        assert_eq!(tx.summary(), 800);
        assert_eq!(tx.reference(), Some("ref-1"));
        assert_eq!(tx.message(), None);
    }

    #[test]
    fn settle_failure_keeps_billed_summary() {
        let mut tx = draft();
        let payment = PaymentResult::declined("Card declined", GatewayPayload::Empty);
        tx.settle(&payment, 800).unwrap();

        assert_eq!(tx.status(), TransactionStatus::Failed);
        assert_eq!(tx.summary(), 800);
        assert_eq!(tx.message(), Some("Card declined"));
    }

    #[test]
    fn settled_transaction_is_immutable() {
        let mut tx = draft();
        tx.settle(&PaymentResult::success(800, "ref-1", GatewayPayload::Empty), 800)
            .unwrap();
        let before = tx.clone();

        let err = tx
            .settle(&PaymentResult::declined("late", GatewayPayload::Empty), 800)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TransactionImmutable);
        assert_eq!(tx, before);
    }

    #[test]
    fn status_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&TransactionStatus::Pending).unwrap(), "0");
        assert_eq!(serde_json::to_string(&TransactionStatus::Success).unwrap(), "1");
        assert_eq!(serde_json::to_string(&TransactionStatus::Failed).unwrap(), "2");
        assert!(serde_json::from_str::<TransactionStatus>("7").is_err());
    }

    #[test]
    fn payload_is_not_serialized() {
        let mut tx = draft();
        let payload = GatewayPayload::Braintree(BraintreeTransaction {
            id: "bt_9".to_string(),
            ..Default::default()
        });
        tx.settle(&PaymentResult::success(800, "bt_9", payload), 800).unwrap();

        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["status"], 1);
    }

    #[test]
    fn name_and_currency_fall_back() {
        let tx = Transaction::empty();
        assert_eq!(tx.name_or("Backup"), "Backup");
        assert_eq!(tx.currency_or("USD"), "USD");
        assert_eq!(draft().name_or("Backup"), "SEO Toolkit");
    }

    #[test]
    fn payment_method_comes_from_payload() {
        let mut tx = draft();
        let payload = GatewayPayload::Braintree(BraintreeTransaction {
            id: "bt_3".to_string(),
            credit_card_details: Some(CreditCardDetails {
                card_type: Some("Amex".to_string()),
                last4: Some("0005".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        tx.settle(&PaymentResult::success(800, "bt_3", payload), 800).unwrap();

        let parsers = PaymentMethodParsers::with_defaults("ending in");
        let method = tx.payment_method(&parsers).unwrap();
        assert_eq!(method.description(), Some("Amex ending in 0005"));
    }
}
