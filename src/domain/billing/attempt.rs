//! Purchase attempt - working state of one `purchase(plan, host, user)` call.

use crate::domain::foundation::Timestamp;

use super::{
    applicable_discounts, Coupon, Host, PaymentResult, Plan, Purchase, Subscription,
    SubscriptionTerms, User,
};

#[derive(Debug, Clone)]
pub struct PurchaseAttempt {
    pub plan: Plan,
    pub host: Host,
    pub user: Option<User>,
    pub coupon_code: Option<String>,

    /// Purchase the package resolved for this host.
    pub purchase: Option<Purchase>,

    /// Subscription touched by this attempt.
    pub subscription: Option<Subscription>,

    /// Subscription being replaced, credited during balance adjustment.
    ///
    /// Set through [`PurchaseAttempt::replace_subscription`] so its credit
    /// counts towards the charge.
    pub previous_subscription: Option<Subscription>,

    /// `None` when no charge was needed.
    pub payment: Option<PaymentResult>,

    /// Set when a dormant purchase was reactivated instead of sold.
    pub reused_existing: bool,

    pub started_at: Timestamp,

    discounts: Vec<Coupon>,

    /// Buyer's balance when the attempt started.
    available_balance: i64,

    /// Unused credit of the replaced subscription when the attempt started.
    prior_credit: i64,
}

impl PurchaseAttempt {
    /// Starts an attempt, fixing the redeemable coupons and the buyer's
    /// balance up front.
    ///
    /// Consuming one-shot coupons or debiting the balance later in the flow
    /// does not change what this attempt was discounted by.
    pub fn new(plan: Plan, host: Host, user: Option<User>, coupon_code: Option<String>) -> Self {
        let started_at = Timestamp::now();
        let discounts = applicable_discounts(
            &plan.coupons,
            user.as_ref(),
            coupon_code.as_deref(),
            started_at,
        );
        let available_balance = user.as_ref().map_or(0, |u| u.balance.max(0));
        Self {
            plan,
            host,
            user,
            coupon_code,
            purchase: None,
            subscription: None,
            previous_subscription: None,
            payment: None,
            reused_existing: false,
            started_at,
            discounts,
            available_balance,
            prior_credit: 0,
        }
    }

    /// Records the subscription this purchase replaces and freezes its
    /// unused credit.
    pub fn replace_subscription(&mut self, subscription: Option<Subscription>) {
        self.prior_credit = subscription
            .as_ref()
            .map_or(0, |s| s.unused_credit(self.started_at));
        self.previous_subscription = subscription;
    }

    pub fn has_trial(&self) -> bool {
        self.plan.trial_days > 0
    }

    /// Coupons redeemable for this attempt.
    pub fn discounts(&self) -> &[Coupon] {
        &self.discounts
    }

    pub fn price(&self) -> i64 {
        self.plan.price
    }

    /// Sum of coupon discounts, capped at the price.
    pub fn coupon_discount(&self) -> i64 {
        let price = self.price();
        self.discounts()
            .iter()
            .map(|c| c.discount_on(price))
            .fold(0i64, |acc, d| acc.saturating_add(d))
            .clamp(0, price.max(0))
    }

    /// Part of the price paid from the buyer's balance and the replaced
    /// subscription's credit. Trials use none of it.
    pub fn balance_credit(&self) -> i64 {
        if self.has_trial() {
            return 0;
        }
        let due = (self.price() - self.coupon_discount()).max(0);
        self.available_balance
            .saturating_add(self.prior_credit)
            .clamp(0, due)
    }

    /// Coupon discount plus balance credit, capped at the price.
    pub fn discount(&self) -> i64 {
        self.coupon_discount()
            .saturating_add(self.balance_credit())
            .clamp(0, self.price().max(0))
    }

    /// Price after discounts.
    pub fn summary(&self) -> i64 {
        (self.price() - self.discount()).max(0)
    }

    /// Amount to send to the processor.
    pub fn charge_amount(&self) -> i64 {
        if self.has_trial() {
            0
        } else {
            self.summary()
        }
    }

    /// True when there was no charge or the charge went through.
    pub fn payment_cleared(&self) -> bool {
        self.payment.as_ref().map(|p| p.successful).unwrap_or(true)
    }

    pub fn payment_succeeded(&self) -> bool {
        self.payment.as_ref().map(|p| p.successful).unwrap_or(false)
    }

    pub fn payment_failed(&self) -> bool {
        self.payment.as_ref().map(|p| !p.successful).unwrap_or(false)
    }

    pub fn currency_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.plan.currency_or(default)
    }

    /// Terms billed on every renewal. Balance credit only covers this
    /// attempt, so recurring charges carry the coupon discount alone.
    pub fn subscription_terms(&self) -> SubscriptionTerms {
        let discount = self.coupon_discount();
        SubscriptionTerms {
            plan: self.plan.clone(),
            price: self.price(),
            discount,
            summary: (self.price() - discount).max(0),
            coupons: self.discounts.clone(),
            currency: self.plan.currency.clone(),
        }
    }
}
