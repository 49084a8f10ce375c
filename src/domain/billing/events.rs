//! Billing domain events.
//!
//! Published after failed charges so other parts of the platform can notify
//! the buyer or schedule follow-up.

use crate::domain::foundation::{
    DomainEvent, EventId, HostId, PackageId, PlanId, PurchaseId, SubscriptionId, Timestamp,
    TransactionId, UserId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseEvent {
    /// A purchase charge was declined or errored.
    ///
    /// Emitted after the FAILED transaction is persisted.
    PurchaseFailed {
        event_id: EventId,
        purchase_id: Option<PurchaseId>,
        package_id: PackageId,
        host_id: HostId,
        plan_id: PlanId,
        user_id: Option<UserId>,
        transaction_id: TransactionId,
        amount: i64,
        message: String,
        occurred_at: Timestamp,
    },

    /// A renewal or frequency-switch charge of an existing subscription failed.
    RenewalFailed {
        event_id: EventId,
        subscription_id: SubscriptionId,
        purchase_id: PurchaseId,
        transaction_id: TransactionId,
        amount: i64,
        message: String,
        occurred_at: Timestamp,
    },
}

impl DomainEvent for PurchaseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseEvent::PurchaseFailed { .. } => "purchase.failed.v1",
            PurchaseEvent::RenewalFailed { .. } => "subscription.renewal_failed.v1",
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            PurchaseEvent::PurchaseFailed {
                purchase_id,
                transaction_id,
                ..
            } => purchase_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| transaction_id.to_string()),
            PurchaseEvent::RenewalFailed {
                subscription_id, ..
            } => subscription_id.to_string(),
        }
    }

    fn aggregate_type(&self) -> &'static str {
        match self {
            PurchaseEvent::PurchaseFailed { .. } => "Purchase",
            PurchaseEvent::RenewalFailed { .. } => "Subscription",
        }
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            PurchaseEvent::PurchaseFailed { occurred_at, .. }
            | PurchaseEvent::RenewalFailed { occurred_at, .. } => *occurred_at,
        }
    }

    fn event_id(&self) -> EventId {
        match self {
            PurchaseEvent::PurchaseFailed { event_id, .. }
            | PurchaseEvent::RenewalFailed { event_id, .. } => event_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SerializableDomainEvent;

    #[test]
    fn purchase_failed_envelope() {
        let purchase_id = PurchaseId::new();
        let event = PurchaseEvent::PurchaseFailed {
            event_id: EventId::new(),
            purchase_id: Some(purchase_id),
            package_id: PackageId::new("seo").unwrap(),
            host_id: HostId::new("site-1").unwrap(),
            plan_id: PlanId::new("pro").unwrap(),
            user_id: Some(UserId::new("user-1").unwrap()),
            transaction_id: TransactionId::new(),
            amount: 1_000,
            message: "Declined".to_string(),
            occurred_at: Timestamp::now(),
        };

        let envelope = event.to_envelope().unwrap();
        assert_eq!(envelope.event_type, "purchase.failed.v1");
        assert_eq!(envelope.aggregate_type, "Purchase");
        assert_eq!(envelope.aggregate_id, purchase_id.to_string());

        let decoded: PurchaseEvent = envelope.payload_as().unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn purchase_failed_without_purchase_uses_transaction() {
        let transaction_id = TransactionId::new();
        let event = PurchaseEvent::PurchaseFailed {
            event_id: EventId::new(),
            purchase_id: None,
            package_id: PackageId::new("seo").unwrap(),
            host_id: HostId::new("site-1").unwrap(),
            plan_id: PlanId::new("pro").unwrap(),
            user_id: None,
            transaction_id,
            amount: 0,
            message: String::new(),
            occurred_at: Timestamp::now(),
        };
        assert_eq!(event.aggregate_id(), transaction_id.to_string());
    }
}
