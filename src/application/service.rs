//! NegotiationApplicationService - business operations composed from handlers.
//!
//! The handlers each run one aggregate operation. The service strings them
//! together with the analysis service: viability before a proposal goes
//! out, momentum after a response comes in, a final assessment when a
//! negotiation is closed, and health monitoring across sessions.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::analysis::{
    Conflict, MomentumAnalysis, NegotiationService, SessionHealthReport, ViabilityAnalysis,
};
use crate::domain::foundation::{CommandMetadata, DomainError, SessionId, Timestamp};
use crate::domain::negotiation::{NegotiationOutcome, NegotiationSession, TerminationReason};
use crate::ports::{EventPublisher, NegotiationRepository};

use super::handlers::negotiation::{analysis_domain, commit, load_session};
use super::handlers::{
    SessionCommandResult, SubmitProposalCommand, SubmitProposalHandler, SubmitResponseCommand,
};

/// A submitted proposal together with its pre-submission viability.
#[derive(Debug, Clone)]
pub struct ProposalSubmission {
    pub viability: ViabilityAnalysis,
    pub result: SessionCommandResult,
}

/// A recorded response and the momentum recomputed after it.
#[derive(Debug, Clone)]
pub struct ResponseSubmission {
    pub momentum: MomentumAnalysis,
    /// False when the response completed the negotiation, in which case the
    /// snapshot is reported but not stored.
    pub momentum_recorded: bool,
    pub result: SessionCommandResult,
}

#[derive(Debug, Clone)]
pub struct CompleteNegotiationCommand {
    pub session_id: SessionId,
    pub outcome: NegotiationOutcome,
    pub reason: TerminationReason,
}

/// Final assessment captured when a negotiation is closed.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub session_id: SessionId,
    pub outcome: NegotiationOutcome,
    pub final_momentum: MomentumAnalysis,
    pub final_conflicts: Vec<Conflict>,
    #[serde(skip)]
    pub result: Option<SessionCommandResult>,
}

pub struct NegotiationApplicationService {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    analysis: NegotiationService,
    submit_proposal: SubmitProposalHandler,
}

impl NegotiationApplicationService {
    pub fn new(
        repository: Arc<dyn NegotiationRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        analysis: NegotiationService,
    ) -> Self {
        Self {
            submit_proposal: SubmitProposalHandler::new(repository.clone(), event_publisher.clone()),
            repository,
            event_publisher,
            analysis,
        }
    }

    /// Analyses the proposal's viability against the current parties, then
    /// submits it. A poor outlook is reported, not enforced.
    pub async fn submit_proposal(
        &self,
        cmd: SubmitProposalCommand,
        metadata: CommandMetadata,
    ) -> Result<ProposalSubmission, DomainError> {
        let session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let viability = self.analysis.analyze_viability(
            &cmd.proposal,
            session.parties(),
            analysis_domain(&session),
            metadata.issued_at,
        );
        if !viability.is_viable() {
            tracing::warn!(
                session_id = %cmd.session_id,
                proposal_id = %cmd.proposal.id(),
                probability = viability.acceptance_probability,
                critical_issues = viability.critical_issues.len(),
                "submitting proposal with low viability"
            );
        }

        let result = self.submit_proposal.handle(cmd, metadata).await?;
        Ok(ProposalSubmission { viability, result })
    }

    /// Submits a response and, while the session is still active, stores
    /// the momentum recomputed after it.
    ///
    /// Response and momentum go out in one commit, so a failed save leaves
    /// neither behind and the command can be retried as is.
    pub async fn submit_proposal_response(
        &self,
        cmd: SubmitResponseCommand,
        metadata: CommandMetadata,
    ) -> Result<ResponseSubmission, DomainError> {
        let at = metadata.issued_at;
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();
        let responder = cmd.response.responder();

        session.submit_response(cmd.response, at)?;
        let momentum = self.momentum_of(&session, at);
        let momentum_recorded = session.is_active();
        if momentum_recorded {
            session.record_metrics(momentum.clone(), at)?;
        }

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
            responder = %responder,
            outcome = %result.session.outcome(),
            momentum = momentum.score.value(),
            momentum_recorded,
            "response processed"
        );
        Ok(ResponseSubmission {
            momentum,
            momentum_recorded,
            result,
        })
    }

    /// Records final momentum and conflicts, then terminates, all in one
    /// commit.
    pub async fn complete_negotiation(
        &self,
        cmd: CompleteNegotiationCommand,
        metadata: CommandMetadata,
    ) -> Result<CompletionReport, DomainError> {
        let at = metadata.issued_at;
        let mut session = load_session(self.repository.as_ref(), &cmd.session_id).await?;
        let expected = session.version();

        let final_momentum = self.momentum_of(&session, at);
        let final_conflicts = self.conflicts_of(&session);

        session.record_metrics(final_momentum.clone(), at)?;
        session.record_conflicts(&final_conflicts, at)?;
        session.terminate(cmd.outcome, cmd.reason, Some(metadata.actor_id.clone()), at)?;

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
            momentum = final_momentum.score.value(),
            conflicts = final_conflicts.len(),
            "negotiation completed"
        );
        Ok(CompletionReport {
            session_id: cmd.session_id,
            outcome: cmd.outcome,
            final_momentum,
            final_conflicts,
            result: Some(result),
        })
    }

    /// Read-only health assessment of one session.
    pub async fn monitor_session_health(
        &self,
        session_id: SessionId,
        now: Timestamp,
    ) -> Result<SessionHealthReport, DomainError> {
        let session = load_session(self.repository.as_ref(), &session_id).await?;
        Ok(self.health_of(&session, now))
    }

    /// Assesses every active session, least healthy first.
    pub async fn monitor_all_active(&self, now: Timestamp) -> Result<Vec<SessionHealthReport>, DomainError> {
        let active = self.repository.find_active().await?;
        let mut reports: Vec<SessionHealthReport> =
            active.iter().map(|session| self.health_of(session, now)).collect();
        reports.sort_by(|a, b| a.health_score.value().total_cmp(&b.health_score.value()));

        tracing::debug!(sessions = reports.len(), "health monitoring pass finished");
        Ok(reports)
    }

    fn momentum_of(&self, session: &NegotiationSession, now: Timestamp) -> MomentumAnalysis {
        self.analysis
            .calculate_momentum(session.all_responses(), session.phase(), now)
    }

    fn conflicts_of(&self, session: &NegotiationSession) -> Vec<Conflict> {
        self.analysis
            .detect_conflicts(session.parties(), session.all_responses())
    }

    fn health_of(&self, session: &NegotiationSession, now: Timestamp) -> SessionHealthReport {
        let conflicts = self.conflicts_of(session);
        let momentum = self.momentum_of(session, now);
        self.analysis.assess_health(session, conflicts, momentum, now)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::adapters::{InMemoryEventBus, InMemoryNegotiationRepository};
    use crate::domain::foundation::{ActorId, EntityId, ErrorCode, PartyId, ProposalId, TermId};
    use crate::domain::negotiation::{
        AuthorityLevel, NegotiationPhase, NegotiationType, Party, PartyRole, ProposalResponse,
        ProposalTerms, ProposalType, ResponseType, SessionConfiguration, SessionMetadata,
        TermCondition, TermResponse,
    };
    use crate::ports::{
        BatchUpdateResult, Paging, RepositoryStatistics, SessionCriteria, SessionOrdering, SessionPage,
        SessionUpdate,
    };

    /// Delegates to the in-memory store, counts loads by id, and fails the
    /// next save once armed.
    struct InstrumentedRepository {
        inner: InMemoryNegotiationRepository,
        fail_next_save: AtomicBool,
        loads: AtomicUsize,
    }

    impl InstrumentedRepository {
        fn new() -> Self {
            Self {
                inner: InMemoryNegotiationRepository::new(),
                fail_next_save: AtomicBool::new(false),
                loads: AtomicUsize::new(0),
            }
        }

        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }

        fn fail_next_save(&self) {
            self.fail_next_save.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl NegotiationRepository for InstrumentedRepository {
        async fn save(&self, session: &NegotiationSession, expected_version: Option<u64>) -> Result<(), DomainError> {
            if self.fail_next_save.swap(false, Ordering::SeqCst) {
                return Err(DomainError::new(ErrorCode::DatabaseError, "write rejected"));
            }
            self.inner.save(session, expected_version).await
        }

        async fn get_by_id(&self, id: &SessionId) -> Result<Option<NegotiationSession>, DomainError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_by_id(id).await
        }

        async fn find_by_filters(
            &self,
            criteria: &SessionCriteria,
            paging: Paging,
            ordering: SessionOrdering,
        ) -> Result<SessionPage, DomainError> {
            self.inner.find_by_filters(criteria, paging, ordering).await
        }

        async fn find_by_creator(&self, creator: &ActorId) -> Result<Vec<NegotiationSession>, DomainError> {
            self.inner.find_by_creator(creator).await
        }

        async fn find_by_participant(&self, entity: &EntityId) -> Result<Vec<NegotiationSession>, DomainError> {
            self.inner.find_by_participant(entity).await
        }

        async fn find_active(&self) -> Result<Vec<NegotiationSession>, DomainError> {
            self.inner.find_active().await
        }

        async fn find_by_status(&self, phase: NegotiationPhase) -> Result<Vec<NegotiationSession>, DomainError> {
            self.inner.find_by_status(phase).await
        }

        async fn find_by_domain(&self, domain: &str) -> Result<Vec<NegotiationSession>, DomainError> {
            self.inner.find_by_domain(domain).await
        }

        async fn find_by_type(&self, negotiation_type: NegotiationType) -> Result<Vec<NegotiationSession>, DomainError> {
            self.inner.find_by_type(negotiation_type).await
        }

        async fn find_requiring_attention(
            &self,
            window_hours: u32,
            now: Timestamp,
        ) -> Result<Vec<NegotiationSession>, DomainError> {
            self.inner.find_requiring_attention(window_hours, now).await
        }

        async fn count_by_criteria(&self, criteria: &SessionCriteria) -> Result<u64, DomainError> {
            self.inner.count_by_criteria(criteria).await
        }

        async fn delete(&self, id: &SessionId) -> Result<(), DomainError> {
            self.inner.delete(id).await
        }

        async fn exists(&self, id: &SessionId) -> Result<bool, DomainError> {
            self.inner.exists(id).await
        }

        async fn statistics(&self) -> Result<RepositoryStatistics, DomainError> {
            self.inner.statistics().await
        }

        async fn find_by_date_range(&self, from: Timestamp, to: Timestamp) -> Result<Vec<NegotiationSession>, DomainError> {
            self.inner.find_by_date_range(from, to).await
        }

        async fn batch_update(&self, updates: Vec<SessionUpdate>) -> Result<BatchUpdateResult, DomainError> {
            self.inner.batch_update(updates).await
        }
    }

    struct Fixture {
        service: NegotiationApplicationService,
        repo: Arc<dyn NegotiationRepository>,
        bus: Arc<InMemoryEventBus>,
        session_id: SessionId,
        parties: [PartyId; 2],
        now: Timestamp,
    }

    async fn fixture(config: SessionConfiguration) -> Fixture {
        fixture_on(Arc::new(InMemoryNegotiationRepository::new()), config).await
    }

    async fn fixture_on(repo: Arc<dyn NegotiationRepository>, config: SessionConfiguration) -> Fixture {
        let now = Timestamp::now();
        let bus = Arc::new(InMemoryEventBus::new());
        let mut session = NegotiationSession::create(
            SessionId::new(),
            SessionMetadata::new("Joint venture", NegotiationType::Partnership).unwrap(),
            config,
            ActorId::new("ops").unwrap(),
            now,
        )
        .unwrap();
        let a = Party::new(PartyId::new(), EntityId::new("north").unwrap(), "North", PartyRole::Initiator, AuthorityLevel::Full).unwrap();
        let b = Party::new(PartyId::new(), EntityId::new("south").unwrap(), "South", PartyRole::Respondent, AuthorityLevel::Full).unwrap();
        let parties = [a.id(), b.id()];
        session.add_party(a, now).unwrap();
        session.add_party(b, now).unwrap();
        repo.save(&session, None).await.unwrap();

        Fixture {
            service: NegotiationApplicationService::new(repo.clone(), bus.clone(), NegotiationService::default()),
            repo,
            bus,
            session_id: session.id(),
            parties,
            now,
        }
    }

    fn proposal(now: Timestamp) -> ProposalTerms {
        ProposalTerms::new(
            ProposalId::new(),
            ProposalType::Initial,
            "Equal split",
            "",
            vec![TermCondition::new(TermId::new("equity").unwrap(), "ownership", "50/50").unwrap()],
            None,
            now,
        )
        .unwrap()
    }

    fn accept(proposal: ProposalId, by: PartyId, at: Timestamp) -> ProposalResponse {
        ProposalResponse::builder(proposal, by, ResponseType::Accept, at)
            .term_response(TermResponse::accept(TermId::new("equity").unwrap()))
            .build()
            .unwrap()
    }

    async fn submit(f: &Fixture) -> ProposalId {
        let p = proposal(f.now);
        let id = p.id();
        let submission = f
            .service
            .submit_proposal(
                SubmitProposalCommand {
                    session_id: f.session_id,
                    submitted_by: f.parties[0],
                    proposal: p,
                },
                CommandMetadata::test_fixture().issued_at(f.now),
            )
            .await
            .unwrap();
        assert_eq!(submission.viability.party_scores.len(), 2);
        id
    }

    #[tokio::test]
    async fn response_records_momentum_while_active() {
        let f = fixture(SessionConfiguration::default()).await;
        let pid = submit(&f).await;

        let submitted = f
            .service
            .submit_proposal_response(
                SubmitResponseCommand {
                    session_id: f.session_id,
                    response: accept(pid, f.parties[1], f.now),
                },
                CommandMetadata::test_fixture().issued_at(f.now),
            )
            .await
            .unwrap();

        assert!(submitted.momentum_recorded);
        assert_eq!(
            submitted.result.event_types(),
            vec!["negotiation.response_received.v1", "negotiation.metrics_updated.v1"]
        );
        let stored = f.repo.get_by_id(&f.session_id).await.unwrap().unwrap();
        assert_eq!(stored.latest_metrics().map(|m| m.response_count), Some(1));
        assert_eq!(stored.version(), submitted.result.session.version());
    }

    #[tokio::test]
    async fn failed_response_save_leaves_nothing_behind_and_retries_cleanly() {
        let repo = Arc::new(InstrumentedRepository::new());
        let f = fixture_on(repo.clone(), SessionConfiguration::default()).await;
        let pid = submit(&f).await;
        let before = f.repo.get_by_id(&f.session_id).await.unwrap().unwrap().version();
        let published_before = f.bus.event_count().await;
        let command = || SubmitResponseCommand {
            session_id: f.session_id,
            response: accept(pid, f.parties[1], f.now),
        };

        repo.fail_next_save();
        let err = f
            .service
            .submit_proposal_response(command(), CommandMetadata::test_fixture().issued_at(f.now))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        let stored = f.repo.get_by_id(&f.session_id).await.unwrap().unwrap();
        assert_eq!(stored.version(), before);
        assert!(stored.all_responses().is_empty());
        assert!(stored.latest_metrics().is_none());
        assert_eq!(f.bus.event_count().await, published_before);

        let retried = f
            .service
            .submit_proposal_response(command(), CommandMetadata::test_fixture().issued_at(f.now))
            .await
            .unwrap();
        assert!(retried.momentum_recorded);
        let stored = f.repo.get_by_id(&f.session_id).await.unwrap().unwrap();
        assert_eq!(stored.all_responses().len(), 1);
        assert_eq!(stored.latest_metrics().map(|m| m.response_count), Some(1));
        assert_eq!(f.bus.events_of_type("negotiation.response_received.v1").await.len(), 1);
        assert_eq!(f.bus.events_of_type("negotiation.metrics_updated.v1").await.len(), 1);
    }

    #[tokio::test]
    async fn completing_response_reports_momentum_without_storing() {
        let f = fixture(SessionConfiguration::default()).await;
        let pid = submit(&f).await;

        let mut last = None;
        for party in f.parties {
            last = Some(
                f.service
                    .submit_proposal_response(
                        SubmitResponseCommand {
                            session_id: f.session_id,
                            response: accept(pid, party, f.now),
                        },
                        CommandMetadata::test_fixture().issued_at(f.now),
                    )
                    .await
                    .unwrap(),
            );
        }
        let last = last.unwrap();
        assert!(!last.momentum_recorded);
        assert_eq!(last.momentum.response_count, 2);
        assert_eq!(last.result.session.outcome(), NegotiationOutcome::AgreementReached);
    }

    #[tokio::test]
    async fn complete_negotiation_commits_once() {
        let f = fixture(SessionConfiguration::default()).await;
        submit(&f).await;
        let before = f.repo.get_by_id(&f.session_id).await.unwrap().unwrap().version();

        let report = f
            .service
            .complete_negotiation(
                CompleteNegotiationCommand {
                    session_id: f.session_id,
                    outcome: NegotiationOutcome::NoAgreement,
                    reason: TerminationReason::Deadlock,
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        let stored = f.repo.get_by_id(&f.session_id).await.unwrap().unwrap();
        assert_eq!(stored.outcome(), NegotiationOutcome::NoAgreement);
        assert_eq!(stored.phase(), NegotiationPhase::Terminated);
        // metrics and termination each bump the version; no conflicts here
        assert_eq!(stored.version(), before + 2);
        assert!(report.final_conflicts.is_empty());
        assert!(f.bus.has_event("negotiation.terminated.v1").await);
    }

    #[tokio::test]
    async fn complete_negotiation_leaves_session_untouched_on_failure() {
        let f = fixture(SessionConfiguration::default()).await;
        let before = f.repo.get_by_id(&f.session_id).await.unwrap().unwrap().version();

        let err = f
            .service
            .complete_negotiation(
                CompleteNegotiationCommand {
                    session_id: f.session_id,
                    outcome: NegotiationOutcome::AgreementReached,
                    reason: TerminationReason::MutualAgreement,
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientAgreement);
        let stored = f.repo.get_by_id(&f.session_id).await.unwrap().unwrap();
        assert_eq!(stored.version(), before);
        assert_eq!(f.bus.event_count().await, 0);
    }

    #[tokio::test]
    async fn monitor_all_active_sorts_by_health() {
        let f = fixture(SessionConfiguration::default()).await;
        submit(&f).await;
        // a second, idle session in bargaining without proposals scores lower
        let mut stalled = NegotiationSession::create(
            SessionId::new(),
            SessionMetadata::new("Stalled", NegotiationType::Dispute).unwrap(),
            SessionConfiguration::default(),
            ActorId::new("ops").unwrap(),
            f.now.minus_hours(30),
        )
        .unwrap();
        for (name, role) in [("x", PartyRole::Initiator), ("y", PartyRole::Respondent)] {
            let p = Party::new(PartyId::new(), EntityId::new(name).unwrap(), name, role, AuthorityLevel::Full).unwrap();
            stalled.add_party(p, f.now.minus_hours(30)).unwrap();
        }
        stalled
            .advance_phase(NegotiationPhase::Opening, true, None, f.now.minus_hours(30))
            .unwrap();
        stalled
            .advance_phase(NegotiationPhase::Bargaining, true, None, f.now.minus_hours(30))
            .unwrap();
        f.repo.save(&stalled, None).await.unwrap();

        let reports = f.service.monitor_all_active(f.now).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].session_id, stalled.id());
        assert!(reports[0].health_score.value() <= reports[1].health_score.value());
    }

    #[tokio::test]
    async fn monitor_all_active_assesses_listed_sessions_without_reloading() {
        let repo = Arc::new(InstrumentedRepository::new());
        let f = fixture_on(repo.clone(), SessionConfiguration::default()).await;
        submit(&f).await;
        let loads_before = repo.loads();

        let reports = f.service.monitor_all_active(f.now).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].session_id, f.session_id);
        assert_eq!(repo.loads(), loads_before);

        let single = f.service.monitor_session_health(f.session_id, f.now).await.unwrap();
        assert_eq!(single.health_score, reports[0].health_score);
    }

    #[tokio::test]
    async fn monitoring_unknown_session_is_not_found() {
        let f = fixture(SessionConfiguration::default()).await;
        let err = f
            .service
            .monitor_session_health(SessionId::new(), f.now)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }
}
