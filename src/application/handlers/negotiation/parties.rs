//! Party membership handlers: join, leave, capability updates.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, DomainError, PartyId, SessionId};
use crate::domain::negotiation::{Capability, Party};
use crate::ports::{EventPublisher, NegotiationRepository};

use super::support::{commit, load_session, SessionCommandResult};

#[derive(Debug, Clone)]
pub struct AddPartyCommand {
    pub session_id: SessionId,
    pub party: Party,
}

#[derive(Debug, Clone)]
pub struct RemovePartyCommand {
    pub session_id: SessionId,
    pub party_id: PartyId,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePartyCapabilitiesCommand {
    pub session_id: SessionId,
    pub party_id: PartyId,
    pub capabilities: Vec<Capability>,
}

pub struct AddPartyHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl AddPartyHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    /// - any `add_party` rule violation (duplicate, capacity, mediator,
    ///   incompatibility, inactive session)
    pub async fn handle(
        &self,
        cmd: AddPartyCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();
        let party_id = cmd.party.id();

        session.add_party(cmd.party, metadata.issued_at)?;

        let result = commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata,
        )
        .await?;
        tracing::info!(session_id = %cmd.session_id, party_id = %party_id, "party joined");
        Ok(result)
    }
}

pub struct RemovePartyHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl RemovePartyHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: RemovePartyCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();

        session.remove_party(&cmd.party_id, cmd.reason, metadata.issued_at)?;

        let result = commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata,
        )
        .await?;
        tracing::info!(session_id = %cmd.session_id, party_id = %cmd.party_id, "party left");
        Ok(result)
    }
}

pub struct UpdatePartyCapabilitiesHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl UpdatePartyCapabilitiesHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdatePartyCapabilitiesCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();

        session.update_party_capabilities(&cmd.party_id, cmd.capabilities, metadata.issued_at)?;

        commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata,
        )
        .await
    }
}
