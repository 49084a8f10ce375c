//! Subscription entity - recurring billing attached to a purchase.
//!
//! # Design Decisions
//!
//! - **Plan snapshot**: the plan is copied at subscribe time so later pricing
//!   changes don't alter what an existing subscription bills
//! - **One active per purchase**: enforced by the subscription manager, which
//!   cancels or extends the current subscription before creating another
//! - **Money in cents**: price, discount and summary are i64 cents

use crate::domain::foundation::{
    DomainError, ErrorCode, HostId, PurchaseId, SubscriptionId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use super::{balance, BillingFrequency, Coupon, Plan, SubscriptionStatus};

const SECS_PER_DAY: i64 = 86_400;

/// Pricing a subscription bills at, taken from a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTerms {
    pub plan: Plan,
    pub price: i64,
    pub discount: i64,
    pub summary: i64,
    pub coupons: Vec<Coupon>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub purchase_id: PurchaseId,
    pub user_id: UserId,
    pub host_id: HostId,

    /// Plan as it was when the subscription was created or last extended.
    pub plan: Plan,

    pub billing_frequency: BillingFrequency,
    pub price: i64,
    pub discount: i64,

    /// Amount billed each period.
    pub summary: i64,

    pub currency: Option<String>,

    #[serde(default)]
    pub coupons: Vec<Coupon>,

    pub status: SubscriptionStatus,

    #[serde(default)]
    pub trial_ends_at: Option<Timestamp>,

    /// Start of the most recently paid period.
    pub current_period_start: Timestamp,

    pub next_billing_at: Timestamp,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    #[serde(default)]
    pub ended_at: Option<Timestamp>,
}

impl Subscription {
    /// Starts a new active subscription.
    ///
    /// With trial days the first billing date is the end of the trial.
    pub fn start(
        purchase_id: PurchaseId,
        user_id: UserId,
        host_id: HostId,
        terms: SubscriptionTerms,
        now: Timestamp,
    ) -> Self {
        let trial_ends_at = (terms.plan.trial_days > 0)
            .then(|| now.add_days(terms.plan.trial_days as i64));
        let next_billing_at = match trial_ends_at {
            Some(end) => end,
            None => advance(now, terms.plan.billing_frequency),
        };

        Self {
            id: SubscriptionId::new(),
            purchase_id,
            user_id,
            host_id,
            billing_frequency: terms.plan.billing_frequency,
            plan: terms.plan,
            price: terms.price,
            discount: terms.discount,
            summary: terms.summary,
            currency: terms.currency,
            coupons: terms.coupons,
            status: SubscriptionStatus::Active,
            trial_ends_at,
            current_period_start: now,
            next_billing_at,
            created_at: now,
            updated_at: now,
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Pricing currently billed, for renewing on the same terms.
    pub fn terms(&self) -> SubscriptionTerms {
        SubscriptionTerms {
            plan: self.plan.clone(),
            price: self.price,
            discount: self.discount,
            summary: self.summary,
            coupons: self.coupons.clone(),
            currency: self.currency.clone(),
        }
    }

    pub fn on_trial(&self, now: Timestamp) -> bool {
        self.trial_ends_at.map(|end| end.is_after(&now)).unwrap_or(false)
    }

    /// Adds one billing period and adopts the new terms.
    ///
    /// The period is appended to the current one when it hasn't run out yet.
    ///
    /// # Errors
    ///
    /// Returns error if the subscription has ended.
    pub fn extend(&mut self, terms: SubscriptionTerms, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;

        let base = if self.next_billing_at.is_after(&now) {
            self.next_billing_at
        } else {
            now
        };
        self.billing_frequency = terms.plan.billing_frequency;
        self.current_period_start = base;
        self.next_billing_at = advance(base, self.billing_frequency);
        self.plan = terms.plan;
        self.price = terms.price;
        self.discount = terms.discount;
        self.summary = terms.summary;
        self.currency = terms.currency;
        self.coupons = terms.coupons;
        self.updated_at = now;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the subscription has already ended.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.ended_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the subscription has already ended.
    pub fn complete(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Completed)?;
        self.ended_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Value of the paid period not used yet, in cents.
    ///
    /// Nothing is credited during a trial or for ended subscriptions.
    pub fn unused_credit(&self, now: Timestamp) -> i64 {
        if !self.is_active() || self.on_trial(now) {
            return 0;
        }
        let Some(days) = self.billing_frequency.period_days() else {
            return 0;
        };
        let remaining = self.next_billing_at.duration_since(&now).num_seconds();
        balance::prorated_credit(self.summary, days * SECS_PER_DAY, remaining)
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        use crate::domain::foundation::StateMachine;

        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

fn advance(from: Timestamp, frequency: BillingFrequency) -> Timestamp {
    match frequency.period_days() {
        Some(days) => from.add_days(days),
        None => from,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{PackageId, PlanId};

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    fn terms(frequency: BillingFrequency, trial_days: u32, summary: i64) -> SubscriptionTerms {
        let plan = Plan::new(
            PlanId::new("pro").unwrap(),
            PackageId::new("seo").unwrap(),
            "Pro",
            summary,
            frequency,
        )
        .with_trial_days(trial_days);
        SubscriptionTerms {
            plan,
            price: summary,
            discount: 0,
            summary,
            coupons: vec![],
            currency: None,
        }
    }

    fn subscription(frequency: BillingFrequency, trial_days: u32, summary: i64) -> Subscription {
        Subscription::start(
            PurchaseId::new(),
            UserId::new("user-1").unwrap(),
            HostId::new("site-1").unwrap(),
            terms(frequency, trial_days, summary),
            now(),
        )
    }

    #[test]
    fn start_bills_after_one_period() {
        let s = subscription(BillingFrequency::Monthly, 0, 3_000);
        assert!(s.is_active());
        assert!(!s.on_trial(now()));
        assert_eq!(s.next_billing_at, now().add_days(30));
    }

    #[test]
    fn start_with_trial_bills_after_trial() {
        let s = subscription(BillingFrequency::Monthly, 14, 3_000);
        assert!(s.on_trial(now()));
        assert!(!s.on_trial(now().add_days(15)));
        assert_eq!(s.next_billing_at, now().add_days(14));
    }

    #[test]
    fn extend_appends_to_running_period() {
        let mut s = subscription(BillingFrequency::Monthly, 0, 3_000);
        s.extend(terms(BillingFrequency::Monthly, 0, 3_000), now().add_days(10))
            .unwrap();
        assert_eq!(s.next_billing_at, now().add_days(60));
    }

    #[test]
    fn extend_after_lapse_starts_from_now() {
        let mut s = subscription(BillingFrequency::Monthly, 0, 3_000);
        let later = now().add_days(45);
        s.extend(terms(BillingFrequency::Monthly, 0, 3_000), later).unwrap();
        assert_eq!(s.next_billing_at, later.add_days(30));
    }

    #[test]
    fn renewing_on_current_terms_keeps_pricing() {
        let mut s = subscription(BillingFrequency::Quarterly, 0, 9_000);
        let current = s.terms();
        s.extend(current.clone(), now()).unwrap();
        assert_eq!(s.summary, 9_000);
        assert_eq!(s.terms(), current);
        assert_eq!(s.next_billing_at, now().add_days(180));
    }

    #[test]
    fn cancelled_subscription_cannot_extend() {
        let mut s = subscription(BillingFrequency::Monthly, 0, 3_000);
        s.cancel(now()).unwrap();
        let err = s
            .extend(terms(BillingFrequency::Monthly, 0, 3_000), now())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn complete_records_end() {
        let mut s = subscription(BillingFrequency::Yearly, 0, 10_000);
        s.complete(now()).unwrap();
        assert_eq!(s.status, SubscriptionStatus::Completed);
        assert_eq!(s.ended_at, Some(now()));
    }

    #[test]
    fn unused_credit_is_prorated() {
        let s = subscription(BillingFrequency::Monthly, 0, 3_000);
        // 20 of 30 days left
        assert_eq!(s.unused_credit(now().add_days(10)), 2_000);
        assert_eq!(s.unused_credit(now().add_days(40)), 0);
    }

    #[test]
    fn no_credit_during_trial() {
        let s = subscription(BillingFrequency::Monthly, 7, 3_000);
        assert_eq!(s.unused_credit(now()), 0);
    }
}
