//! EventPublisher port - Interface for publishing domain events.
//!
//! This port defines how the domain publishes events without knowing
//! about the underlying transport mechanism.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Implementations must ensure:
/// - Events are delivered at-least-once (handlers may receive duplicates)
/// - Errors are propagated to the caller
///
/// The purchase flow treats publishing as fire-and-forget and only logs
/// errors it gets back.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish multiple events.
    ///
    /// For adapters that don't support atomic publishing, events are
    /// published sequentially with best-effort delivery.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
