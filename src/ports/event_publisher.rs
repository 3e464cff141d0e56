//! EventPublisher port - post-commit delivery of negotiation events.
//!
//! Handlers publish only after the repository accepted the save, so
//! subscribers never observe events for state that was rolled back.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Delivery is at-least-once; subscribers must tolerate duplicates and use
/// `event_id` to deduplicate.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single envelope.
    ///
    /// # Errors
    ///
    /// - `PublishFailed` when the transport rejects the event
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish envelopes in order, stopping at the first failure.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
