//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, error types, the state machine trait
//! and event infrastructure used across the billing domain.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent};
pub use ids::{HostId, InvoiceId, PackageId, PlanId, PurchaseId, SubscriptionId, TransactionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
