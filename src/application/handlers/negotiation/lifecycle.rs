//! Phase and termination handlers.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, DomainError, SessionId};
use crate::domain::negotiation::{NegotiationOutcome, NegotiationPhase, TerminationReason, TimeoutCheck};
use crate::ports::{EventPublisher, NegotiationRepository};

use super::support::{commit, load_session, SessionCommandResult};

#[derive(Debug, Clone)]
pub struct AdvancePhaseCommand {
    pub session_id: SessionId,
    pub target: NegotiationPhase,
    /// Skips the readiness predicate. Ordering rules still apply.
    pub forced: bool,
}

#[derive(Debug, Clone)]
pub struct TerminateCommand {
    pub session_id: SessionId,
    pub outcome: NegotiationOutcome,
    pub reason: TerminationReason,
}

#[derive(Debug, Clone)]
pub struct CheckTimeoutCommand {
    pub session_id: SessionId,
}

#[derive(Debug, Clone)]
pub struct CheckTimeoutResult {
    pub check: TimeoutCheck,
    pub result: SessionCommandResult,
}

pub struct AdvancePhaseHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl AdvancePhaseHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    /// # Errors
    ///
    /// - `InvalidStateTransition` for backward or skipping moves
    /// - `PhaseNotReady` for an unforced move whose predicate fails
    pub async fn handle(
        &self,
        cmd: AdvancePhaseCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();
        let from = session.phase();

        session.advance_phase(
            cmd.target,
            cmd.forced,
            Some(metadata.actor_id.clone()),
            metadata.issued_at,
        )?;

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
            from = %from,
            to = %cmd.target,
            forced = cmd.forced,
            "phase advanced"
        );
        Ok(result)
    }
}

pub struct TerminateHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl TerminateHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: TerminateCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();

        session.terminate(
            cmd.outcome,
            cmd.reason,
            Some(metadata.actor_id.clone()),
            metadata.issued_at,
        )?;

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
            outcome = %cmd.outcome,
            reason = %cmd.reason,
            "negotiation terminated"
        );
        Ok(result)
    }
}

pub struct CheckTimeoutHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CheckTimeoutHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    /// Polls the deadline as of `metadata.issued_at`.
    pub async fn handle(
        &self,
        cmd: CheckTimeoutCommand,
        metadata: CommandMetadata,
    ) -> Result<CheckTimeoutResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();

        let check = session.check_timeout(metadata.issued_at)?;
        match check {
            TimeoutCheck::TimedOut => tracing::warn!(session_id = %cmd.session_id, "negotiation timed out"),
            TimeoutCheck::WarningIssued { hours_remaining } => {
                tracing::info!(session_id = %cmd.session_id, hours_remaining, "timeout warning issued")
            }
            TimeoutCheck::Inactive | TimeoutCheck::OnTrack => {}
        }

        let result = commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata,
        )
        .await?;
        Ok(CheckTimeoutResult { check, result })
    }
}
