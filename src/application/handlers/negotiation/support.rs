//! Shared load / commit steps for negotiation command handlers.

use crate::domain::foundation::{
    CommandMetadata, DomainError, ErrorCode, SerializableDomainEvent, SessionId,
};
use crate::domain::negotiation::{NegotiationEvent, NegotiationSession};
use crate::ports::{EventPublisher, NegotiationRepository};

/// Result of a command that mutated a session.
#[derive(Debug, Clone)]
pub struct SessionCommandResult {
    /// The session as committed, with an empty event buffer.
    pub session: NegotiationSession,
    /// Events produced by this command, in emission order.
    pub events: Vec<NegotiationEvent>,
}

impl SessionCommandResult {
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.payload.event_type()).collect()
    }
}

pub(crate) async fn load_session(
    repository: &dyn NegotiationRepository,
    id: &SessionId,
) -> Result<NegotiationSession, DomainError> {
    repository
        .get_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found(ErrorCode::SessionNotFound, "Session", id))
}

/// Saves the session against `expected_version`, publishes its pending
/// events, then clears them.
///
/// Nothing is published when the save fails. A session whose version did
/// not move is returned untouched without a save.
pub(crate) async fn commit(
    repository: &dyn NegotiationRepository,
    publisher: &dyn EventPublisher,
    mut session: NegotiationSession,
    expected_version: Option<u64>,
    metadata: &CommandMetadata,
) -> Result<SessionCommandResult, DomainError> {
    if expected_version == Some(session.version()) {
        return Ok(SessionCommandResult {
            session,
            events: Vec::new(),
        });
    }

    repository.save(&session, expected_version).await?;

    let events = session.drain_events();
    let envelopes = events
        .iter()
        .map(|event| {
            let envelope = event
                .to_envelope()
                .with_correlation_id(metadata.correlation_id())
                .with_causation_id(metadata.command_id.clone())
                .with_actor_id(metadata.actor_id.to_string());
            match metadata.trace_id() {
                Some(trace) => envelope.with_trace_id(trace),
                None => envelope,
            }
        })
        .collect();
    publisher.publish_all(envelopes).await?;
    session.mark_committed();

    tracing::debug!(
        session_id = %session.id(),
        version = session.version(),
        events = events.len(),
        "session committed"
    );
    Ok(SessionCommandResult { session, events })
}
