//! In-memory event bus.
//!
//! Records every published envelope and dispatches it to subscribed
//! handlers in registration order. Delivery happens inline with `publish`,
//! which keeps tests deterministic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

#[derive(Default)]
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every envelope published so far, oldest first.
    pub async fn published_events(&self) -> Vec<EventEnvelope> {
        self.published.read().await.clone()
    }

    pub async fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub async fn events_for_session(&self, session_id: &str) -> Vec<EventEnvelope> {
        self.published
            .read()
            .await
            .iter()
            .filter(|e| e.aggregate_id == session_id)
            .cloned()
            .collect()
    }

    pub async fn event_count(&self) -> usize {
        self.published.read().await.len()
    }

    pub async fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .await
            .iter()
            .any(|e| e.event_type == event_type)
    }

    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.published.write().await.push(event.clone());

        // release the lock before awaiting handlers
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .await
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        let mut failures = Vec::new();
        for handler in handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(handler = handler.name(), event_type = %event.event_type, error = %e, "event handler failed");
                failures.push(format!("{}: {}", handler.name(), e));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::PublishFailed,
                format!("handler errors: {}", failures.join(", ")),
            ))
        }
    }
}

#[async_trait]
impl EventSubscriber for InMemoryEventBus {
    async fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .await
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventId, EventMetadata, Timestamp};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn envelope(event_type: &str, session: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: EventId::new(),
            event_type: event_type.to_string(),
            schema_version: 1,
            aggregate_id: session.to_string(),
            aggregate_type: "NegotiationSession".to_string(),
            occurred_at: Timestamp::now(),
            payload: json!({}),
            metadata: EventMetadata::default(),
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for Counting {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "Counting"
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::InternalError, "boom"))
        }

        fn name(&self) -> &'static str {
            "Failing"
        }
    }

    #[tokio::test]
    async fn records_and_filters_published_events() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("negotiation.party_joined.v1", "s1")).await.unwrap();
        bus.publish(envelope("negotiation.completed.v1", "s2")).await.unwrap();
        bus.publish(envelope("negotiation.party_joined.v1", "s2")).await.unwrap();

        assert_eq!(bus.event_count().await, 3);
        assert_eq!(bus.events_of_type("negotiation.party_joined.v1").await.len(), 2);
        assert_eq!(bus.events_for_session("s2").await.len(), 2);
        assert!(bus.has_event("negotiation.completed.v1").await);

        bus.clear().await;
        assert_eq!(bus.event_count().await, 0);
    }

    #[tokio::test]
    async fn dispatches_to_subscribed_handlers_only() {
        let bus = InMemoryEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe_all(
            &["negotiation.completed.v1", "negotiation.terminated.v1"],
            Arc::new(Counting(count.clone())),
        )
        .await;

        bus.publish(envelope("negotiation.completed.v1", "s1")).await.unwrap();
        bus.publish(envelope("negotiation.terminated.v1", "s1")).await.unwrap();
        bus.publish(envelope("negotiation.party_joined.v1", "s1")).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn handler_failure_is_reported_but_event_is_recorded() {
        let bus = InMemoryEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe("negotiation.completed.v1", Arc::new(Failing)).await;
        bus.subscribe("negotiation.completed.v1", Arc::new(Counting(count.clone()))).await;

        let err = bus
            .publish(envelope("negotiation.completed.v1", "s1"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PublishFailed);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.event_count().await, 1);
    }
}
