//! Parley - multi-party negotiation engine
//!
//! This crate models negotiation sessions as an event-producing aggregate
//! with a phase state machine, stateless analysis over parties, proposals
//! and responses, and command/query handlers that persist sessions with
//! optimistic concurrency and publish their events after commit.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
