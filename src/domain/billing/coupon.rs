//! Coupons and the redemption rules that decide whether one applies.

use crate::domain::foundation::{Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::User;

/// How a coupon gets redeemed.
///
/// Unrecognized values from storage deserialize into `Unknown` and are never
/// redeemable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RedeemType {
    /// Redeemable only by users holding the code in their coupon set.
    Internal,
    /// Redeemable only when the buyer typed the code.
    Manual,
    /// Always applied.
    AutoRedeem,
    Unknown(String),
}

impl RedeemType {
    pub fn as_str(&self) -> &str {
        match self {
            RedeemType::Internal => "INTERNAL",
            RedeemType::Manual => "MANUAL",
            RedeemType::AutoRedeem => "AUTOREDEEM",
            RedeemType::Unknown(raw) => raw,
        }
    }
}

impl From<String> for RedeemType {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "INTERNAL" => RedeemType::Internal,
            "MANUAL" => RedeemType::Manual,
            "AUTOREDEEM" => RedeemType::AutoRedeem,
            _ => RedeemType::Unknown(raw),
        }
    }
}

impl From<RedeemType> for String {
    fn from(redeem: RedeemType) -> Self {
        redeem.as_str().to_string()
    }
}

impl fmt::Display for RedeemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discount a coupon grants on a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountRule {
    Percentage { percent: u8 },
    Fixed { amount: i64 },
}

/// A discount code attached to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub redeem: RedeemType,
    pub rule: DiscountRule,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

impl Coupon {
    /// Creates a percentage coupon, rejecting percentages above 100.
    pub fn percentage(
        code: impl Into<String>,
        redeem: RedeemType,
        percent: u8,
    ) -> Result<Self, ValidationError> {
        if percent > 100 {
            return Err(ValidationError::out_of_range("percent", 0, 100, percent as i64));
        }
        Self::build(code, redeem, DiscountRule::Percentage { percent })
    }

    /// Creates a fixed-amount coupon, rejecting negative amounts.
    pub fn fixed(
        code: impl Into<String>,
        redeem: RedeemType,
        amount: i64,
    ) -> Result<Self, ValidationError> {
        if amount < 0 {
            return Err(ValidationError::out_of_range("amount", 0, i64::MAX, amount));
        }
        Self::build(code, redeem, DiscountRule::Fixed { amount })
    }

    fn build(
        code: impl Into<String>,
        redeem: RedeemType,
        rule: DiscountRule,
    ) -> Result<Self, ValidationError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(ValidationError::empty_field("code"));
        }
        Ok(Self {
            code,
            redeem,
            rule,
            expires_at: None,
        })
    }

    pub fn expiring_at(mut self, at: Timestamp) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.map(|at| !at.is_after(&now)).unwrap_or(false)
    }

    /// Whether redeeming this coupon consumes it from the user's set.
    pub fn is_one_shot(&self) -> bool {
        matches!(self.redeem, RedeemType::Internal | RedeemType::Manual)
    }

    /// Discount this coupon grants on `price`, never more than the price.
    pub fn discount_on(&self, price: i64) -> i64 {
        if price <= 0 {
            return 0;
        }
        let discount = match self.rule {
            DiscountRule::Percentage { percent } => {
                (price as i128 * percent as i128 / 100) as i64
            }
            DiscountRule::Fixed { amount } => amount,
        };
        discount.clamp(0, price)
    }
}

/// Decides whether `coupon` is redeemable in the given context.
pub fn evaluate_coupon<'a>(
    coupon: &'a Coupon,
    actor: Option<&User>,
    request_code: Option<&str>,
) -> Option<&'a Coupon> {
    let redeemable = match &coupon.redeem {
        RedeemType::Internal => actor.map(|u| u.has_coupon(&coupon.code)).unwrap_or(false),
        RedeemType::Manual => request_code == Some(coupon.code.as_str()),
        RedeemType::AutoRedeem => true,
        RedeemType::Unknown(_) => false,
    };
    redeemable.then_some(coupon)
}

/// Unexpired redeemable coupons, keeping their input order.
pub fn applicable_discounts(
    coupons: &[Coupon],
    actor: Option<&User>,
    request_code: Option<&str>,
    now: Timestamp,
) -> Vec<Coupon> {
    coupons
        .iter()
        .filter(|c| !c.is_expired(now))
        .filter_map(|c| evaluate_coupon(c, actor, request_code))
        .cloned()
        .collect()
}
