//! Negotiation module - the session aggregate and its value objects.
//!
//! - `NegotiationSession` - aggregate root running the phase state machine
//! - `Party`, `ProposalTerms`, `ProposalResponse` - child value objects
//! - `NegotiationStatus` - phase, outcome and lifecycle timestamps
//! - `NegotiationEvent` - events buffered by the aggregate

mod aggregate;
mod configuration;
mod events;
mod metadata;
mod party;
mod phase;
mod proposal;
mod response;
mod status;

pub use aggregate::{AgreementTally, NegotiationSession, ProposalRecord, ProposalStatus, TimeoutCheck};
pub use configuration::SessionConfiguration;
pub use events::{NegotiationEvent, NegotiationEventPayload};
pub use metadata::{NegotiationType, PhaseChange, SessionMetadata};
pub use party::{
    AuthorityLevel, Capability, CommunicationStyle, Mandate, NegotiationStyle, Party,
    PartyConstraints, PartyPreferences, PartyRole, TimePreferences, TimePressure,
};
pub use phase::{NegotiationOutcome, NegotiationPhase, TerminationReason};
pub use proposal::{ProposalTerms, ProposalType, TermCondition, TermPriority};
pub use response::{
    ProposalResponse, ProposalResponseBuilder, ResponseType, TermResponse, TermResponseType,
};
pub use status::NegotiationStatus;
