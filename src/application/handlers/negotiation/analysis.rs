//! SessionAnalysisHandler - runs the analysis service against stored sessions.
//!
//! Read-only analyses never save. Conflict detection and momentum can
//! optionally be recorded on the session, which commits like any other
//! command.

use std::sync::Arc;

use crate::domain::analysis::{
    Conflict, MomentumAnalysis, NegotiationService, StrategyRecommendation, TermOptimizationResult,
    ViabilityAnalysis,
};
use crate::domain::foundation::{
    CommandMetadata, DomainError, ErrorCode, PartyId, ProposalId, Score, SessionId, Timestamp,
};
use crate::domain::negotiation::{NegotiationOutcome, NegotiationSession, Party, ProposalTerms};
use crate::ports::{EventPublisher, NegotiationRepository};

use super::support::{commit, load_session, SessionCommandResult};

#[derive(Debug, Clone)]
pub struct AnalyzeCompatibilityQuery {
    pub session_id: SessionId,
    pub party_a: PartyId,
    pub party_b: PartyId,
}

#[derive(Debug, Clone)]
pub struct AnalyzeProposalQuery {
    pub session_id: SessionId,
    pub proposal_id: ProposalId,
    /// Reference time for validity and mandate checks.
    pub as_of: Timestamp,
}

#[derive(Debug, Clone)]
pub struct RecommendStrategyQuery {
    pub session_id: SessionId,
    pub target: Option<NegotiationOutcome>,
}

#[derive(Debug, Clone)]
pub struct DetectConflictsCommand {
    pub session_id: SessionId,
    /// Emit the conflicts as session events.
    pub record: bool,
}

#[derive(Debug, Clone)]
pub struct CalculateMomentumCommand {
    pub session_id: SessionId,
    /// Store the snapshot on the session.
    pub record: bool,
}

#[derive(Debug, Clone)]
pub struct ConflictDetectionResult {
    pub conflicts: Vec<Conflict>,
    /// Present when the conflicts were recorded.
    pub committed: Option<SessionCommandResult>,
}

#[derive(Debug, Clone)]
pub struct MomentumResult {
    pub momentum: MomentumAnalysis,
    pub committed: Option<SessionCommandResult>,
}

pub struct SessionAnalysisHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    service: NegotiationService,
}

impl SessionAnalysisHandler {
    pub fn new(
        repository: Arc<dyn NegotiationRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        service: NegotiationService,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            service,
        }
    }

    pub async fn compatibility(&self, query: AnalyzeCompatibilityQuery) -> Result<Score, DomainError> {
        let session = load_session(self.repository.as_ref(), &query.session_id).await?;
        let a = require_party(&session, &query.party_a)?;
        let b = require_party(&session, &query.party_b)?;
        Ok(self.service.compatibility(a, b, analysis_domain(&session)))
    }

    pub async fn viability(&self, query: AnalyzeProposalQuery) -> Result<ViabilityAnalysis, DomainError> {
        let session = load_session(self.repository.as_ref(), &query.session_id).await?;
        let proposal = require_active_proposal(&session, &query.proposal_id)?;
        let analysis = self.service.analyze_viability(
            proposal,
            session.parties(),
            analysis_domain(&session),
            query.as_of,
        );
        tracing::debug!(
            session_id = %query.session_id,
            proposal_id = %query.proposal_id,
            probability = analysis.acceptance_probability,
            "viability analysed"
        );
        Ok(analysis)
    }

    pub async fn optimize_terms(&self, query: AnalyzeProposalQuery) -> Result<TermOptimizationResult, DomainError> {
        let session = load_session(self.repository.as_ref(), &query.session_id).await?;
        let proposal = require_active_proposal(&session, &query.proposal_id)?;
        Ok(self.service.optimize_terms(
            proposal,
            session.parties(),
            analysis_domain(&session),
            query.as_of,
        ))
    }

    pub async fn strategy(&self, query: RecommendStrategyQuery) -> Result<StrategyRecommendation, DomainError> {
        let session = load_session(self.repository.as_ref(), &query.session_id).await?;
        Ok(self
            .service
            .recommend_strategy(session.parties(), analysis_domain(&session), query.target))
    }

    pub async fn conflicts(
        &self,
        cmd: DetectConflictsCommand,
        metadata: CommandMetadata,
    ) -> Result<ConflictDetectionResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let conflicts = self
            .service
            .detect_conflicts(session.parties(), session.all_responses());
        if !cmd.record || conflicts.is_empty() {
            return Ok(ConflictDetectionResult {
                conflicts,
                committed: None,
            });
        }

        let expected = session.version();
        session.record_conflicts(&conflicts, metadata.issued_at)?;
        let committed = commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata,
        )
        .await?;
        tracing::info!(session_id = %cmd.session_id, count = conflicts.len(), "conflicts recorded");
        Ok(ConflictDetectionResult {
            conflicts,
            committed: Some(committed),
        })
    }

    pub async fn momentum(
        &self,
        cmd: CalculateMomentumCommand,
        metadata: CommandMetadata,
    ) -> Result<MomentumResult, DomainError> {
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let momentum = self
            .service
            .calculate_momentum(session.all_responses(), session.phase(), metadata.issued_at);
        if !cmd.record {
            return Ok(MomentumResult {
                momentum,
                committed: None,
            });
        }

        let expected = session.version();
        session.record_metrics(momentum.clone(), metadata.issued_at)?;
        let committed = commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata,
        )
        .await?;
        Ok(MomentumResult {
            momentum,
            committed: Some(committed),
        })
    }
}

/// The session's subject area, used as the analysis domain.
pub(crate) fn analysis_domain(session: &NegotiationSession) -> Option<&str> {
    session.metadata().domain.as_deref()
}

fn require_party<'a>(session: &'a NegotiationSession, id: &PartyId) -> Result<&'a Party, DomainError> {
    session
        .party(id)
        .ok_or_else(|| DomainError::not_found(ErrorCode::PartyNotFound, "Party", id))
}

fn require_active_proposal<'a>(
    session: &'a NegotiationSession,
    id: &ProposalId,
) -> Result<&'a ProposalTerms, DomainError> {
    session
        .active_proposal(id)
        .map(|record| &record.proposal)
        .ok_or_else(|| DomainError::not_found(ErrorCode::ProposalNotFound, "Proposal", id))
}
