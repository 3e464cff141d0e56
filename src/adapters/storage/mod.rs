//! Storage adapters implementing the `NegotiationRepository` port.
//!
//! - **InMemoryNegotiationRepository** - committed sessions in memory

mod in_memory_negotiation_repository;

pub use in_memory_negotiation_repository::InMemoryNegotiationRepository;
