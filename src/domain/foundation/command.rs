//! Command infrastructure for CQRS handlers.
//!
//! Every command arriving from the transport layer carries a command id, an
//! issue timestamp, and the acting identity. Handlers receive them bundled as
//! [`CommandMetadata`] and propagate them onto published events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActorId, Timestamp};

/// Metadata context for command handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// Unique id of this command (used as causation id on events).
    pub command_id: String,

    /// When the command was issued.
    pub issued_at: Timestamp,

    /// Who is executing this command.
    pub actor_id: ActorId,

    /// Links related operations across a single request.
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,

    /// Distributed tracing span/trace ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,

    /// Source of this command (e.g., "api", "scheduler", "batch").
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandMetadata {
    /// Creates new command metadata for an actor, stamped now.
    pub fn new(actor_id: ActorId) -> Self {
        Self {
            command_id: Uuid::new_v4().to_string(),
            issued_at: Timestamp::now(),
            actor_id,
            correlation_id: None,
            trace_id: None,
            source: None,
        }
    }

    /// Builder: Override the command id.
    pub fn with_command_id(mut self, id: impl Into<String>) -> Self {
        self.command_id = id.into();
        self
    }

    /// Builder: Override the issue time.
    pub fn issued_at(mut self, at: Timestamp) -> Self {
        self.issued_at = at;
        self
    }

    /// Builder: Add correlation ID for request tracing.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Builder: Add trace ID for distributed tracing.
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Builder: Add source identifier.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the correlation ID, falling back to the command id.
    ///
    /// Every command therefore has a stable correlation id even when the
    /// transport layer did not provide one.
    pub fn correlation_id(&self) -> String {
        self.correlation_id
            .clone()
            .unwrap_or_else(|| self.command_id.clone())
    }

    /// Returns the trace ID if set.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Returns the source if set.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Derives metadata for a sub-command issued on behalf of this one.
    pub fn child(&self) -> Self {
        Self {
            command_id: Uuid::new_v4().to_string(),
            issued_at: self.issued_at,
            actor_id: self.actor_id.clone(),
            correlation_id: Some(self.correlation_id()),
            trace_id: self.trace_id.clone(),
            source: self.source.clone(),
        }
    }
}

#[cfg(test)]
impl CommandMetadata {
    /// Creates a test fixture with a test actor ID.
    pub fn test_fixture() -> Self {
        Self::new(ActorId::new("test-actor").unwrap())
            .with_correlation_id("test-correlation-id")
            .with_source("test")
    }
}
