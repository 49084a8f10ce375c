//! Buyer account as seen by billing: balance, coupon set and gateway.

use crate::domain::foundation::{HostId, PlanId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use super::{balance, Coupon};

/// A coupon code held by a user, optionally scoped to where it was earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCoupon {
    pub code: String,
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    #[serde(default)]
    pub host_id: Option<HostId>,
    pub granted_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Account credit in cents. Never negative.
    pub balance: i64,

    /// Gateway the user pays through, if they have one on file.
    #[serde(default)]
    pub payment_gateway: Option<String>,

    #[serde(default)]
    coupons: Vec<UserCoupon>,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            balance: 0,
            payment_gateway: None,
            coupons: Vec::new(),
        }
    }

    pub fn with_balance(mut self, balance: i64) -> Self {
        self.balance = balance.max(0);
        self
    }

    pub fn with_payment_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.payment_gateway = Some(gateway.into());
        self
    }

    pub fn coupons(&self) -> &[UserCoupon] {
        &self.coupons
    }

    pub fn coupon_codes(&self) -> Vec<&str> {
        self.coupons.iter().map(|c| c.code.as_str()).collect()
    }

    pub fn has_coupon(&self, code: &str) -> bool {
        self.coupons.iter().any(|c| c.code == code)
    }

    /// Drops codes consumed by the given discounts.
    ///
    /// Only one-shot coupons (internal and manual) are consumed.
    pub fn remove_coupons(&mut self, discounts: &[Coupon]) {
        let consumed: Vec<&str> = discounts
            .iter()
            .filter(|d| d.is_one_shot())
            .map(|d| d.code.as_str())
            .collect();
        if consumed.is_empty() {
            return;
        }
        self.coupons.retain(|c| !consumed.contains(&c.code.as_str()));
    }

    /// Grants coupon codes scoped to the plan and host they were earned on.
    pub fn add_coupons<I>(&mut self, codes: I, plan_id: Option<&PlanId>, host_id: Option<&HostId>)
    where
        I: IntoIterator<Item = String>,
    {
        let now = Timestamp::now();
        for code in codes {
            if self.has_coupon(&code) {
                continue;
            }
            self.coupons.push(UserCoupon {
                code,
                plan_id: plan_id.cloned(),
                host_id: host_id.cloned(),
                granted_at: now,
            });
        }
    }

    /// Charges `price` against the balance, clamping at zero.
    ///
    /// A negative price credits the balance.
    pub fn charge_balance(&mut self, price: i64) {
        self.balance = balance::apply_to_balance(self.balance, price);
    }
}
