//! Invoice - receipt view over a plan and its transaction.
//!
//! Not a source of truth; rebuilt from the attempt that produced it.

use crate::domain::foundation::{HostId, InvoiceId, PackageId, PlanId, Timestamp};
use serde::{Deserialize, Serialize};

use super::{BillingFrequency, Plan, PurchaseAttempt, Subscription, Transaction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub plan_id: PlanId,
    pub plan_name: String,
    pub package_id: PackageId,
    pub host_id: HostId,
    pub billing_frequency: BillingFrequency,
    pub trial_days: u32,

    /// Set when a dormant purchase was reactivated.
    pub reused_existing: bool,

    pub transaction: Transaction,

    /// Invoices of bundled plans, in bundle order.
    #[serde(default)]
    pub additional_invoices: Vec<Invoice>,

    pub issued_at: Timestamp,
}

impl Invoice {
    pub fn for_attempt(attempt: &PurchaseAttempt, transaction: Transaction) -> Self {
        let mut invoice = Self::for_plan(&attempt.plan, &attempt.host.id, transaction);
        invoice.reused_existing = attempt.reused_existing;
        invoice
    }

    pub fn for_subscription(subscription: &Subscription, transaction: Transaction) -> Self {
        Self::for_plan(&subscription.plan, &subscription.host_id, transaction)
    }

    fn for_plan(plan: &Plan, host_id: &HostId, transaction: Transaction) -> Self {
        Self {
            id: InvoiceId::new(),
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            package_id: plan.package_id.clone(),
            host_id: host_id.clone(),
            billing_frequency: plan.billing_frequency,
            trial_days: plan.trial_days,
            reused_existing: false,
            transaction,
            additional_invoices: Vec::new(),
            issued_at: Timestamp::now(),
        }
    }

    pub fn has_trial(&self) -> bool {
        self.trial_days > 0
    }

    /// Captured amount including bundled invoices.
    pub fn total(&self) -> i64 {
        self.transaction.summary()
            + self
                .additional_invoices
                .iter()
                .map(Invoice::total)
                .sum::<i64>()
    }
}
