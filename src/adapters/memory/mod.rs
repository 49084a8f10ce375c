//! In-memory adapters for users, packages, subscriptions and transactions.
//!
//! Used by tests and by embedders that keep billing state in process.

mod packages;
mod subscriptions;
mod transactions;
mod users;

pub use packages::{InMemoryPackage, InMemoryPackageDirectory};
pub use subscriptions::InMemorySubscriptionRepository;
pub use transactions::InMemoryTransactionRepository;
pub use users::InMemoryUserRepository;
