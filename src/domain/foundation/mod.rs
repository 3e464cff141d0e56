//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, errors, command metadata and the event
//! infrastructure that form the vocabulary of the negotiation domain.

mod command;
mod errors;
mod events;
mod ids;
mod score;
mod state_machine;
mod timestamp;

pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ErrorKind, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent};
pub use ids::{ActorId, EntityId, PartyId, ProposalId, ResponseId, SessionId, TermId};
pub use score::Score;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
