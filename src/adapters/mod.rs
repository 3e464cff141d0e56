//! Adapters - Implementations of port interfaces.
//!
//! - `events` - in-memory event bus
//! - `storage` - in-memory negotiation repository

pub mod events;
pub mod storage;

pub use events::InMemoryEventBus;
pub use storage::InMemoryNegotiationRepository;
