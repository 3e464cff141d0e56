//! EventSubscriber port - in-process reactions to published events.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Reacts to one published envelope.
///
/// Handlers must be idempotent: the same `event_id` may arrive twice.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Name used in error messages and logs.
    fn name(&self) -> &'static str;
}

/// Registration of handlers by event type, e.g. `negotiation.completed.v1`.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    async fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        for event_type in event_types {
            self.subscribe(event_type, Arc::clone(&handler)).await;
        }
    }
}

/// Publisher and subscriber in one.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}
