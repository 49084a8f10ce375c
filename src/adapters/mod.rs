//! Adapters - Implementations of port interfaces.
//!
//! - `events` - Event bus implementations
//! - `memory` - In-memory repositories and packages
//! - `payment` - Payment processor implementations

pub mod events;
pub mod memory;
pub mod payment;

pub use events::InMemoryEventBus;
pub use memory::{
    InMemoryPackage, InMemoryPackageDirectory, InMemorySubscriptionRepository,
    InMemoryTransactionRepository, InMemoryUserRepository,
};
pub use payment::{MockPaymentProcessor, ScriptedCharge};
