//! CreateSessionHandler - opens a new negotiation.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, DomainError, SessionId};
use crate::domain::negotiation::{
    NegotiationSession, NegotiationType, Party, SessionConfiguration, SessionMetadata,
};
use crate::ports::{EventPublisher, NegotiationRepository};

use super::support::{commit, SessionCommandResult};

#[derive(Debug, Clone)]
pub struct CreateSessionCommand {
    pub title: String,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub negotiation_type: NegotiationType,
    /// Falls back to the handler's default configuration.
    pub configuration: Option<SessionConfiguration>,
    /// Parties added before the first save.
    pub initial_parties: Vec<Party>,
}

impl CreateSessionCommand {
    pub fn new(title: impl Into<String>, negotiation_type: NegotiationType) -> Self {
        Self {
            title: title.into(),
            description: None,
            domain: None,
            negotiation_type,
            configuration: None,
            initial_parties: Vec::new(),
        }
    }
}

pub struct CreateSessionHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    default_configuration: SessionConfiguration,
}

impl CreateSessionHandler {
    pub fn new(
        repository: Arc<dyn NegotiationRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        default_configuration: SessionConfiguration,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            default_configuration,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<SessionCommandResult, DomainError> {
        let mut session_metadata = SessionMetadata::new(cmd.title, cmd.negotiation_type)?;
        if let Some(description) = cmd.description {
            session_metadata = session_metadata.with_description(description);
        }
        if let Some(domain) = cmd.domain {
            session_metadata = session_metadata.with_domain(domain);
        }

        let at = metadata.issued_at;
        let mut session = NegotiationSession::create(
            SessionId::new(),
            session_metadata,
            cmd.configuration.unwrap_or(self.default_configuration),
            metadata.actor_id.clone(),
            at,
        )?;
        for party in cmd.initial_parties {
            session.add_party(party, at)?;
        }

        let result = commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            None,
            &metadata,
        )
        .await?;

        tracing::info!(
            session_id = %result.session.id(),
            parties = result.session.party_count(),
            "negotiation session created"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryEventBus, InMemoryNegotiationRepository};
    use crate::domain::foundation::{EntityId, ErrorCode, PartyId};
    use crate::domain::negotiation::{AuthorityLevel, NegotiationPhase, PartyRole};

    fn party(name: &str, role: PartyRole) -> Party {
        Party::new(PartyId::new(), EntityId::new(name).unwrap(), name, role, AuthorityLevel::Full).unwrap()
    }

    fn handler() -> (CreateSessionHandler, Arc<InMemoryNegotiationRepository>, Arc<InMemoryEventBus>) {
        let repo = Arc::new(InMemoryNegotiationRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = CreateSessionHandler::new(repo.clone(), bus.clone(), SessionConfiguration::default());
        (handler, repo, bus)
    }

    #[tokio::test]
    async fn creates_persists_and_publishes() {
        let (handler, repo, bus) = handler();
        let mut cmd = CreateSessionCommand::new("Office lease", NegotiationType::Commercial);
        cmd.domain = Some("real-estate".to_string());

        let result = handler.handle(cmd, CommandMetadata::test_fixture()).await.unwrap();

        assert!(repo.exists(&result.session.id()).await.unwrap());
        assert!(result.session.pending_events().is_empty());
        assert_eq!(result.event_types(), vec!["negotiation.session_created.v1"]);
        let published = bus.published_events().await;
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].metadata.correlation_id.as_deref(),
            Some("test-correlation-id")
        );
    }

    #[tokio::test]
    async fn initial_parties_auto_advance_to_preparation() {
        let (handler, _, _) = handler();
        let mut cmd = CreateSessionCommand::new("Office lease", NegotiationType::Commercial);
        cmd.initial_parties = vec![party("landlord", PartyRole::Initiator), party("tenant", PartyRole::Respondent)];

        let result = handler.handle(cmd, CommandMetadata::test_fixture()).await.unwrap();
        assert_eq!(result.session.party_count(), 2);
        assert_eq!(result.session.phase(), NegotiationPhase::Preparation);
    }

    #[tokio::test]
    async fn invalid_configuration_is_rejected_before_save() {
        let (handler, repo, bus) = handler();
        let mut cmd = CreateSessionCommand::new("Office lease", NegotiationType::Commercial);
        cmd.configuration = Some(SessionConfiguration::default().with_max_parties(1));

        let err = handler.handle(cmd, CommandMetadata::test_fixture()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(repo.is_empty().await);
        assert_eq!(bus.event_count().await, 0);
    }
}
