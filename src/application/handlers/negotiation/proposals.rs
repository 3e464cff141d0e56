//! Proposal handlers: submit, withdraw, expire, respond.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, DomainError, PartyId, ProposalId, SessionId};
use crate::domain::negotiation::{ProposalResponse, ProposalTerms};
use crate::ports::{EventPublisher, NegotiationRepository};

use super::support::{commit, load_session, SessionCommandResult};

#[derive(Debug, Clone)]
pub struct SubmitProposalCommand {
    pub session_id: SessionId,
    pub submitted_by: PartyId,
    pub proposal: ProposalTerms,
}

#[derive(Debug, Clone)]
pub struct WithdrawProposalCommand {
    pub session_id: SessionId,
    pub proposal_id: ProposalId,
    pub withdrawn_by: PartyId,
}

#[derive(Debug, Clone)]
pub struct ExpireProposalsCommand {
    pub session_id: SessionId,
}

#[derive(Debug, Clone)]
pub struct SubmitResponseCommand {
    pub session_id: SessionId,
    pub response: ProposalResponse,
}

#[derive(Debug, Clone)]
pub struct ExpireProposalsResult {
    pub expired: Vec<ProposalId>,
    pub result: SessionCommandResult,
}

pub struct SubmitProposalHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl SubmitProposalHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: SubmitProposalCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();
        let proposal_id = cmd.proposal.id();

        session.submit_proposal(cmd.proposal, &cmd.submitted_by, metadata.issued_at)?;

        let result = commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata,
        )
        .await?;
        tracing::info!(
            session_id = %cmd.session_id,
            proposal_id = %proposal_id,
            submitted_by = %cmd.submitted_by,
            "proposal submitted"
        );
        Ok(result)
    }
}

pub struct WithdrawProposalHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl WithdrawProposalHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: WithdrawProposalCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();

        session.withdraw_proposal(&cmd.proposal_id, &cmd.withdrawn_by, metadata.issued_at)?;

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

pub struct ExpireProposalsHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ExpireProposalsHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    /// Retires proposals whose validity has passed as of `metadata.issued_at`.
    pub async fn handle(
        &self,
        cmd: ExpireProposalsCommand,
        metadata: CommandMetadata,
    ) -> Result<ExpireProposalsResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();

        let expired = session.expire_proposals(metadata.issued_at);
        if !expired.is_empty() {
            tracing::info!(session_id = %cmd.session_id, count = expired.len(), "proposals expired");
        }

        let result = commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata,
        )
        .await?;
        Ok(ExpireProposalsResult { expired, result })
    }
}

pub struct SubmitResponseHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl SubmitResponseHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    /// Records a response; the session may auto-complete as a result.
    pub async fn handle(
        &self,
        cmd: SubmitResponseCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();
        let responder = cmd.response.responder();

        session.submit_response(cmd.response, metadata.issued_at)?;

        let result = commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata,
        )
        .await?;
        if result.session.is_active() {
            tracing::info!(session_id = %cmd.session_id, responder = %responder, "response received");
        } else {
            tracing::info!(
                session_id = %cmd.session_id,
                outcome = %result.session.outcome(),
                "negotiation completed on response"
            );
        }
        Ok(result)
    }
}
