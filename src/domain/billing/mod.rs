//! Billing domain - plans, coupons, purchases, subscriptions and transactions.
//!
//! # Module Structure
//!
//! - `plan` - Plan value object and billing frequency
//! - `coupon` - Coupons and redemption rules
//! - `trial` - Trial eligibility
//! - `balance` - Balance and proration arithmetic
//! - `attempt` - Working state of one purchase call
//! - `subscription` / `subscription_status` - Recurring billing
//! - `transaction` - Immutable audit record
//! - `payment` / `payment_method` - Gateway outcome and its display shape
//! - `invoice` - Receipt view
//! - `errors` / `events` - Failures and published events

mod attempt;
pub mod balance;
mod coupon;
mod errors;
mod events;
mod host;
mod invoice;
mod payment;
mod payment_method;
mod plan;
mod purchase;
mod subscription;
mod subscription_status;
mod transaction;
mod trial;
mod user;

pub use attempt::PurchaseAttempt;
pub use coupon::{applicable_discounts, evaluate_coupon, Coupon, DiscountRule, RedeemType};
pub use errors::PurchaseError;
pub use events::PurchaseEvent;
pub use host::Host;
pub use invoice::Invoice;
pub use payment::{BraintreeTransaction, CreditCardDetails, GatewayPayload, PayPalDetails, PaymentResult};
pub use payment_method::{
    BraintreeMethodParser, PaymentMethod, PaymentMethodParser, PaymentMethodParsers,
};
pub use plan::{BillingFrequency, Plan};
pub use purchase::Purchase;
pub use subscription::{Subscription, SubscriptionTerms};
pub use subscription_status::SubscriptionStatus;
pub use transaction::{Transaction, TransactionDraft, TransactionStatus};
pub use trial::calculate_trial;
pub use user::{User, UserCoupon};
