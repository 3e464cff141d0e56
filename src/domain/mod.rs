//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, events)
//! - `negotiation` - Negotiation session aggregate and its value objects
//! - `analysis` - Pure negotiation analytics (compatibility, viability, momentum)

pub mod analysis;
pub mod foundation;
pub mod negotiation;
