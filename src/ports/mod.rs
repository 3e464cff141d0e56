//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between the
//! negotiation core and the outside world. Adapters implement these ports.
//!
//! - `NegotiationRepository` - persistence with optimistic concurrency
//! - `EventPublisher` - post-commit event delivery
//! - `EventSubscriber` / `EventHandler` - in-process event reactions

mod event_publisher;
mod event_subscriber;
mod negotiation_repository;

pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use negotiation_repository::{
    BatchUpdateResult, NegotiationRepository, Paging, RepositoryStatistics, SessionCriteria,
    SessionOrdering, SessionPage, SessionSortField, SessionUpdate,
};
