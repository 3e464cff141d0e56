//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers mutate one session per unit of work; query handlers
//! only read. [`NegotiationApplicationService`] composes both with the
//! analysis service into business operations.

pub mod handlers;
mod service;

pub use handlers::*;
pub use service::{
    CompleteNegotiationCommand, CompletionReport, NegotiationApplicationService,
    ProposalSubmission, ResponseSubmission,
};
