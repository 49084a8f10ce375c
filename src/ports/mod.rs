//! Ports - interfaces to collaborators outside the engine.
//!
//! Ports are async traits; adapters implement them. The engine never knows
//! how users, packages or records are stored, nor the bytes any payment
//! gateway speaks.

mod event_publisher;
mod package;
mod payment_processor;
mod subscription_billing;
mod subscription_repository;
mod transaction_repository;
mod user_repository;

pub use event_publisher::EventPublisher;
pub use package::{Package, PackageDirectory};
pub use payment_processor::{ChargeRequest, PaymentError, PaymentErrorCode, PaymentProcessor};
pub use subscription_billing::SubscriptionBilling;
pub use subscription_repository::SubscriptionRepository;
pub use transaction_repository::TransactionRepository;
pub use user_repository::UserRepository;
