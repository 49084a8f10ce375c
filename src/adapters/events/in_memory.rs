//! In-memory event bus.
//!
//! Captures published events for assertions and can be switched into a
//! failing mode to exercise publish-error handling.
//!
//! It uses `.expect()` on lock operations which will panic if locks are
//! poisoned; embedders needing durable delivery should provide their own
//! `EventPublisher`.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// In-memory event bus.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.publish(envelope).await?;
///
/// assert_eq!(bus.event_count(), 1);
/// assert!(bus.has_event("purchase.failed.v1"));
/// ```
pub struct InMemoryEventBus {
    published: RwLock<Vec<EventEnvelope>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
        }
    }

    /// Makes every following publish fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self
            .failure
            .write()
            .expect("InMemoryEventBus: failure lock poisoned") = Some(message.into());
    }

    // === Test Helpers ===

    /// Returns all published events.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    pub fn clear(&self) {
        self.published
            .write()
            .expect("InMemoryEventBus: published write lock poisoned")
            .clear();
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .iter()
            .any(|e| e.event_type == event_type)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if let Some(message) = self
            .failure
            .read()
            .expect("InMemoryEventBus: failure lock poisoned")
            .clone()
        {
            return Err(DomainError::new(ErrorCode::ExternalServiceError, message));
        }

        self.published
            .write()
            .expect("InMemoryEventBus: published write lock poisoned")
            .push(event);
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
