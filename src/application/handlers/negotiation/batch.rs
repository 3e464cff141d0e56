//! BatchCommandHandler - runs a list of session commands in order.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, DomainError, SessionId};
use crate::domain::negotiation::SessionConfiguration;
use crate::ports::{EventPublisher, NegotiationRepository};

use super::support::SessionCommandResult;
use super::{
    AddPartyCommand, AddPartyHandler, AdvancePhaseCommand, AdvancePhaseHandler, CheckTimeoutCommand,
    CheckTimeoutHandler, CreateSessionCommand, CreateSessionHandler, RemovePartyCommand,
    RemovePartyHandler, SubmitProposalCommand, SubmitProposalHandler, SubmitResponseCommand,
    SubmitResponseHandler, TerminateCommand, TerminateHandler, UpdatePartyCapabilitiesCommand,
    UpdatePartyCapabilitiesHandler, WithdrawProposalCommand, WithdrawProposalHandler,
};

/// Any command that targets one session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    CreateSession(CreateSessionCommand),
    AddParty(AddPartyCommand),
    RemoveParty(RemovePartyCommand),
    UpdatePartyCapabilities(UpdatePartyCapabilitiesCommand),
    SubmitProposal(SubmitProposalCommand),
    WithdrawProposal(WithdrawProposalCommand),
    SubmitResponse(SubmitResponseCommand),
    AdvancePhase(AdvancePhaseCommand),
    Terminate(TerminateCommand),
    CheckTimeout(CheckTimeoutCommand),
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::CreateSession(_) => "create_session",
            SessionCommand::AddParty(_) => "add_party",
            SessionCommand::RemoveParty(_) => "remove_party",
            SessionCommand::UpdatePartyCapabilities(_) => "update_party_capabilities",
            SessionCommand::SubmitProposal(_) => "submit_proposal",
            SessionCommand::WithdrawProposal(_) => "withdraw_proposal",
            SessionCommand::SubmitResponse(_) => "submit_response",
            SessionCommand::AdvancePhase(_) => "advance_phase",
            SessionCommand::Terminate(_) => "terminate",
            SessionCommand::CheckTimeout(_) => "check_timeout",
        }
    }

    /// Target session; `None` for creation.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            SessionCommand::CreateSession(_) => None,
            SessionCommand::AddParty(c) => Some(c.session_id),
            SessionCommand::RemoveParty(c) => Some(c.session_id),
            SessionCommand::UpdatePartyCapabilities(c) => Some(c.session_id),
            SessionCommand::SubmitProposal(c) => Some(c.session_id),
            SessionCommand::WithdrawProposal(c) => Some(c.session_id),
            SessionCommand::SubmitResponse(c) => Some(c.session_id),
            SessionCommand::AdvancePhase(c) => Some(c.session_id),
            SessionCommand::Terminate(c) => Some(c.session_id),
            SessionCommand::CheckTimeout(c) => Some(c.session_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchCommand {
    pub commands: Vec<SessionCommand>,
    /// Skip the remaining commands after the first failure.
    pub stop_on_first_error: bool,
}

#[derive(Debug, Clone)]
pub struct BatchItemResult {
    pub index: usize,
    pub command: &'static str,
    pub outcome: Result<SessionCommandResult, DomainError>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub items: Vec<BatchItemResult>,
    /// Commands never attempted because an earlier one failed.
    pub skipped: usize,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_err()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0 && self.skipped == 0
    }
}

pub struct BatchCommandHandler {
    create: CreateSessionHandler,
    add_party: AddPartyHandler,
    remove_party: RemovePartyHandler,
    update_capabilities: UpdatePartyCapabilitiesHandler,
    submit_proposal: SubmitProposalHandler,
    withdraw_proposal: WithdrawProposalHandler,
    submit_response: SubmitResponseHandler,
    advance_phase: AdvancePhaseHandler,
    terminate: TerminateHandler,
    check_timeout: CheckTimeoutHandler,
}

impl BatchCommandHandler {
    pub fn new(
        repository: Arc<dyn NegotiationRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        default_configuration: SessionConfiguration,
    ) -> Self {
        let (r, p) = (repository, event_publisher);
        Self {
            create: CreateSessionHandler::new(r.clone(), p.clone(), default_configuration),
            add_party: AddPartyHandler::new(r.clone(), p.clone()),
            remove_party: RemovePartyHandler::new(r.clone(), p.clone()),
            update_capabilities: UpdatePartyCapabilitiesHandler::new(r.clone(), p.clone()),
            submit_proposal: SubmitProposalHandler::new(r.clone(), p.clone()),
            withdraw_proposal: WithdrawProposalHandler::new(r.clone(), p.clone()),
            submit_response: SubmitResponseHandler::new(r.clone(), p.clone()),
            advance_phase: AdvancePhaseHandler::new(r.clone(), p.clone()),
            terminate: TerminateHandler::new(r.clone(), p.clone()),
            check_timeout: CheckTimeoutHandler::new(r, p),
        }
    }

    /// Executes the commands in order, each under child metadata sharing the
    /// batch's correlation id. Failures are isolated per item.
    pub async fn handle(&self, cmd: BatchCommand, metadata: CommandMetadata) -> BatchResult {
        let total = cmd.commands.len();
        let mut result = BatchResult::default();

        for (index, command) in cmd.commands.into_iter().enumerate() {
            let name = command.name();
            let outcome = self.dispatch(command, metadata.child()).await;
            let failed = outcome.is_err();
            if let Err(e) = &outcome {
                tracing::warn!(index, command = name, error = %e, "batch command failed");
            }
            result.items.push(BatchItemResult {
                index,
                command: name,
                outcome,
            });
            if failed && cmd.stop_on_first_error {
                result.skipped = total - index - 1;
                break;
            }
        }

        tracing::info!(
            total,
            succeeded = result.succeeded(),
            failed = result.failed(),
            skipped = result.skipped,
            "batch finished"
        );
        result
    }

    async fn dispatch(
        &self,
        command: SessionCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        match command {
            SessionCommand::CreateSession(c) => self.create.handle(c, metadata).await,
            SessionCommand::AddParty(c) => self.add_party.handle(c, metadata).await,
            SessionCommand::RemoveParty(c) => self.remove_party.handle(c, metadata).await,
            SessionCommand::UpdatePartyCapabilities(c) => self.update_capabilities.handle(c, metadata).await,
            SessionCommand::SubmitProposal(c) => self.submit_proposal.handle(c, metadata).await,
            SessionCommand::WithdrawProposal(c) => self.withdraw_proposal.handle(c, metadata).await,
            SessionCommand::SubmitResponse(c) => self.submit_response.handle(c, metadata).await,
            SessionCommand::AdvancePhase(c) => self.advance_phase.handle(c, metadata).await,
            SessionCommand::Terminate(c) => self.terminate.handle(c, metadata).await,
            SessionCommand::CheckTimeout(c) => self.check_timeout.handle(c, metadata).await.map(|r| r.result),
        }
    }
}
