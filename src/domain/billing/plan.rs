//! Plan value object - a pricing offer for a package.
//!
//! A plan is transient: it is built per purchase attempt, finalized by the
//! trial calculation and never persisted on its own. Subscriptions keep a
//! snapshot of the plan they were created from.

use crate::domain::foundation::{PackageId, PlanId};
use serde::{Deserialize, Serialize};

use super::Coupon;

/// How often a plan bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingFrequency {
    OneTime,
    Monthly,
    Quarterly,
    SemiAnnual,
    Yearly,
}

impl BillingFrequency {
    /// Length of one billing period in days, `None` for one-time plans.
    pub fn period_days(&self) -> Option<i64> {
        match self {
            BillingFrequency::OneTime => None,
            BillingFrequency::Monthly => Some(30),
            BillingFrequency::Quarterly => Some(90),
            BillingFrequency::SemiAnnual => Some(180),
            BillingFrequency::Yearly => Some(365),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BillingFrequency::OneTime => "One-time",
            BillingFrequency::Monthly => "Monthly",
            BillingFrequency::Quarterly => "Quarterly",
            BillingFrequency::SemiAnnual => "Semi-annual",
            BillingFrequency::Yearly => "Yearly",
        }
    }
}

impl std::fmt::Display for BillingFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A purchasable offer for a package.
///
/// All monetary values are minor units (cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,

    /// Package this plan sells.
    pub package_id: PackageId,

    pub name: String,

    /// List price before any discount.
    pub price: i64,

    /// ISO currency code, `None` means the configured default.
    #[serde(default)]
    pub currency: Option<String>,

    pub billing_frequency: BillingFrequency,

    /// Trial length. Finalized by the trial calculation for each attempt.
    #[serde(default)]
    pub trial_days: u32,

    pub is_recurring: bool,

    /// Coupons that may discount this plan, evaluated per attempt.
    #[serde(default)]
    pub coupons: Vec<Coupon>,

    /// Coupon codes granted to the buyer after a successful paid purchase.
    #[serde(default)]
    pub addon_coupons: Vec<String>,

    /// Bundled plans purchased best-effort after this one, in order.
    #[serde(default)]
    pub additional_plans: Vec<Plan>,

    /// Set when an existing plan instance is being renewed explicitly.
    #[serde(default)]
    pub in_renew_mode: bool,
}

impl Plan {
    /// Creates a plan; recurring unless the frequency is one-time.
    pub fn new(
        id: PlanId,
        package_id: PackageId,
        name: impl Into<String>,
        price: i64,
        billing_frequency: BillingFrequency,
    ) -> Self {
        Self {
            id,
            package_id,
            name: name.into(),
            price,
            currency: None,
            billing_frequency,
            trial_days: 0,
            is_recurring: billing_frequency != BillingFrequency::OneTime,
            coupons: Vec::new(),
            addon_coupons: Vec::new(),
            additional_plans: Vec::new(),
            in_renew_mode: false,
        }
    }

    pub fn with_trial_days(mut self, days: u32) -> Self {
        self.trial_days = days;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_coupon(mut self, coupon: Coupon) -> Self {
        self.coupons.push(coupon);
        self
    }

    pub fn with_addon_coupon(mut self, code: impl Into<String>) -> Self {
        self.addon_coupons.push(code.into());
        self
    }

    pub fn with_additional_plan(mut self, plan: Plan) -> Self {
        self.additional_plans.push(plan);
        self
    }

    /// Marks this plan instance for explicit renewal.
    pub fn for_renewal(mut self) -> Self {
        self.in_renew_mode = true;
        self
    }

    /// Returns the plan currency, falling back to the given default.
    pub fn currency_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.currency.as_deref().unwrap_or(default)
    }
}
