//! Read-side handlers and the session projections they return.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::analysis::MomentumAnalysis;
use crate::domain::foundation::{ActorId, DomainError, ErrorCode, SessionId, Timestamp};
use crate::domain::negotiation::{
    NegotiationOutcome, NegotiationPhase, NegotiationSession, NegotiationType, Party, PhaseChange,
    ProposalRecord, TerminationReason,
};
use crate::ports::{
    NegotiationRepository, Paging, RepositoryStatistics, SessionCriteria, SessionOrdering,
};

// ─────────────────────────────────────────────────────────────────────────────
// Projections
// ─────────────────────────────────────────────────────────────────────────────

/// Full read model of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub title: String,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub negotiation_type: NegotiationType,
    pub phase: NegotiationPhase,
    pub outcome: NegotiationOutcome,
    pub termination_reason: Option<TerminationReason>,
    pub created_by: ActorId,
    pub created_at: Timestamp,
    pub last_activity_at: Timestamp,
    pub expected_completion_at: Option<Timestamp>,
    pub version: u64,
    pub parties: Vec<Party>,
    pub active_proposals: Vec<ProposalRecord>,
    pub proposal_history: Vec<ProposalRecord>,
    pub response_count: usize,
    pub phase_history: Vec<PhaseChange>,
    pub latest_metrics: Option<MomentumAnalysis>,
}

impl From<&NegotiationSession> for SessionView {
    fn from(session: &NegotiationSession) -> Self {
        let metadata = session.metadata();
        let status = session.status();
        Self {
            id: session.id(),
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            domain: metadata.domain.clone(),
            negotiation_type: metadata.negotiation_type,
            phase: status.phase(),
            outcome: status.outcome(),
            termination_reason: status.termination_reason(),
            created_by: session.created_by().clone(),
            created_at: session.created_at(),
            last_activity_at: status.last_activity_at(),
            expected_completion_at: status.expected_completion_at(),
            version: session.version(),
            parties: session.parties().cloned().collect(),
            active_proposals: session.active_proposals().cloned().collect(),
            proposal_history: session.proposal_history().to_vec(),
            response_count: session.all_responses().len(),
            phase_history: session.phase_history().to_vec(),
            latest_metrics: session.latest_metrics().cloned(),
        }
    }
}

/// List entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub phase: NegotiationPhase,
    pub outcome: NegotiationOutcome,
    pub party_count: usize,
    pub active_proposal_count: usize,
    pub last_activity_at: Timestamp,
}

impl From<&NegotiationSession> for SessionSummary {
    fn from(session: &NegotiationSession) -> Self {
        Self {
            id: session.id(),
            title: session.metadata().title.clone(),
            phase: session.phase(),
            outcome: session.outcome(),
            party_count: session.party_count(),
            active_proposal_count: session.active_proposal_count(),
            last_activity_at: session.status().last_activity_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionList {
    pub items: Vec<SessionSummary>,
    pub total: u64,
    pub has_more: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GetSessionQuery {
    pub session_id: SessionId,
}

pub struct GetSessionHandler {
    repository: Arc<dyn NegotiationRepository>,
}

impl GetSessionHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetSessionQuery) -> Result<SessionView, DomainError> {
        let session = self
            .repository
            .get_by_id(&query.session_id)
            .await?
            .ok_or_else(|| DomainError::not_found(ErrorCode::SessionNotFound, "Session", query.session_id))?;
        Ok(SessionView::from(&session))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListSessionsQuery {
    pub criteria: SessionCriteria,
    pub paging: Paging,
    pub ordering: SessionOrdering,
}

pub struct ListSessionsHandler {
    repository: Arc<dyn NegotiationRepository>,
}

impl ListSessionsHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: ListSessionsQuery) -> Result<SessionList, DomainError> {
        let page = self
            .repository
            .find_by_filters(&query.criteria, query.paging, query.ordering)
            .await?;
        Ok(SessionList {
            items: page.items.iter().map(SessionSummary::from).collect(),
            total: page.total,
            has_more: page.has_more,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SessionsRequiringAttentionQuery {
    pub window_hours: u32,
    pub as_of: Timestamp,
}

pub struct SessionsRequiringAttentionHandler {
    repository: Arc<dyn NegotiationRepository>,
}

impl SessionsRequiringAttentionHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>) -> Self {
        Self { repository }
    }

    /// Most urgent first.
    pub async fn handle(&self, query: SessionsRequiringAttentionQuery) -> Result<Vec<SessionSummary>, DomainError> {
        let sessions = self
            .repository
            .find_requiring_attention(query.window_hours, query.as_of)
            .await?;
        Ok(sessions.iter().map(SessionSummary::from).collect())
    }
}

pub struct SessionStatisticsHandler {
    repository: Arc<dyn NegotiationRepository>,
}

impl SessionStatisticsHandler {
    pub fn new(repository: Arc<dyn NegotiationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self) -> Result<RepositoryStatistics, DomainError> {
        self.repository.statistics().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryNegotiationRepository;
    use crate::domain::foundation::{EntityId, PartyId};
    use crate::domain::negotiation::{AuthorityLevel, PartyRole, SessionConfiguration, SessionMetadata};

    async fn seed(repo: &InMemoryNegotiationRepository, title: &str, parties: usize, at: Timestamp) -> SessionId {
        let mut session = NegotiationSession::create(
            SessionId::new(),
            SessionMetadata::new(title, NegotiationType::Employment)
                .unwrap()
                .with_domain("hr"),
            SessionConfiguration::default(),
            ActorId::new("recruiter").unwrap(),
            at,
        )
        .unwrap();
        for i in 0..parties {
            let name = format!("{title}-party-{i}");
            let role = if i == 0 { PartyRole::Initiator } else { PartyRole::Respondent };
            let party = Party::new(PartyId::new(), EntityId::new(name.as_str()).unwrap(), name.as_str(), role, AuthorityLevel::Full).unwrap();
            session.add_party(party, at).unwrap();
        }
        repo.save(&session, None).await.unwrap();
        session.id()
    }

    #[tokio::test]
    async fn get_session_projects_the_aggregate() {
        let repo = Arc::new(InMemoryNegotiationRepository::new());
        let id = seed(&repo, "Offer", 2, Timestamp::now()).await;

        let view = GetSessionHandler::new(repo)
            .handle(GetSessionQuery { session_id: id })
            .await
            .unwrap();
        assert_eq!(view.title, "Offer");
        assert_eq!(view.domain.as_deref(), Some("hr"));
        assert_eq!(view.parties.len(), 2);
        assert_eq!(view.phase, NegotiationPhase::Preparation);
        assert_eq!(view.phase_history.len(), 1);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "PREPARATION");
    }

    #[tokio::test]
    async fn get_missing_session_is_not_found() {
        let repo = Arc::new(InMemoryNegotiationRepository::new());
        let err = GetSessionHandler::new(repo)
            .handle(GetSessionQuery {
                session_id: SessionId::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn list_pages_through_matches() {
        let repo = Arc::new(InMemoryNegotiationRepository::new());
        let start = Timestamp::now();
        for (i, title) in ["A", "B", "C"].iter().enumerate() {
            seed(&repo, title, 0, start.plus_hours(i as i64)).await;
        }

        let handler = ListSessionsHandler::new(repo);
        let first = handler
            .handle(ListSessionsQuery {
                paging: Paging::page(1, 2),
                ..ListSessionsQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(first.total, 3);
        assert!(first.has_more);
        // newest first by default
        assert_eq!(first.items[0].title, "C");

        let second = handler
            .handle(ListSessionsQuery {
                paging: Paging::page(2, 2),
                ..ListSessionsQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(!second.has_more);
    }

    #[tokio::test]
    async fn statistics_count_phases() {
        let repo = Arc::new(InMemoryNegotiationRepository::new());
        let now = Timestamp::now();
        seed(&repo, "One", 2, now).await;
        seed(&repo, "Two", 0, now).await;

        let stats = SessionStatisticsHandler::new(repo.clone()).handle().await.unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.active_sessions, 2);
        assert_eq!(stats.by_phase.get(&NegotiationPhase::Initiation), Some(&1));

        let attention = SessionsRequiringAttentionHandler::new(repo)
            .handle(SessionsRequiringAttentionQuery {
                window_hours: 100,
                as_of: now,
            })
            .await
            .unwrap();
        assert_eq!(attention.len(), 2);
    }
}
