//! Version checks on save, and the publish-after-save guarantee.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parley::adapters::{InMemoryEventBus, InMemoryNegotiationRepository};
use parley::application::{AddPartyCommand, AddPartyHandler, CreateSessionCommand, CreateSessionHandler};
use parley::domain::foundation::{
    ActorId, CommandMetadata, DomainError, EntityId, ErrorCode, PartyId, SessionId, Timestamp,
};
use parley::domain::negotiation::{
    AuthorityLevel, NegotiationPhase, NegotiationSession, NegotiationType, Party, PartyRole,
    SessionConfiguration, SessionMetadata,
};
use parley::ports::{
    BatchUpdateResult, NegotiationRepository, Paging, RepositoryStatistics, SessionCriteria,
    SessionOrdering, SessionPage, SessionUpdate,
};

fn party(name: &str, role: PartyRole) -> Party {
    Party::new(PartyId::new(), EntityId::new(name).unwrap(), name, role, AuthorityLevel::Full).unwrap()
}

fn new_session(at: Timestamp) -> NegotiationSession {
    NegotiationSession::create(
        SessionId::new(),
        SessionMetadata::new("Office lease", NegotiationType::Commercial).unwrap(),
        SessionConfiguration::default(),
        ActorId::new("broker").unwrap(),
        at,
    )
    .unwrap()
}

fn metadata() -> CommandMetadata {
    CommandMetadata::new(ActorId::new("broker").unwrap())
}

#[tokio::test]
async fn stale_writer_gets_a_retryable_conflict() {
    let repo = InMemoryNegotiationRepository::new();
    let now = Timestamp::now();
    let session = new_session(now);
    repo.save(&session, None).await.unwrap();

    let mut first = repo.get_by_id(&session.id()).await.unwrap().unwrap();
    let mut second = repo.get_by_id(&session.id()).await.unwrap().unwrap();
    let loaded_at = first.version();

    first.add_party(party("landlord", PartyRole::Initiator), now).unwrap();
    repo.save(&first, Some(loaded_at)).await.unwrap();

    second.add_party(party("tenant", PartyRole::Respondent), now).unwrap();
    let err = repo.save(&second, Some(loaded_at)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConcurrencyConflict);
    assert!(err.is_retryable());

    // reload and reapply
    let mut retried = repo.get_by_id(&session.id()).await.unwrap().unwrap();
    let expected = retried.version();
    retried.add_party(party("tenant", PartyRole::Respondent), now).unwrap();
    repo.save(&retried, Some(expected)).await.unwrap();

    let stored = repo.get_by_id(&session.id()).await.unwrap().unwrap();
    assert_eq!(stored.party_count(), 2);
    assert_eq!(stored.version(), loaded_at + 2);
}

#[tokio::test]
async fn new_session_with_a_taken_id_conflicts() {
    let repo = InMemoryNegotiationRepository::new();
    let session = new_session(Timestamp::now());
    repo.save(&session, None).await.unwrap();

    let err = repo.save(&session, None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConcurrencyConflict);
}

#[tokio::test]
async fn batch_update_saves_what_it_can() {
    let repo = InMemoryNegotiationRepository::new();
    let now = Timestamp::now();
    let fresh = new_session(now);
    let stale = new_session(now);
    repo.save(&fresh, None).await.unwrap();
    repo.save(&stale, None).await.unwrap();

    // another writer moves `stale` on first
    let mut ahead = stale.clone();
    ahead.add_party(party("agent", PartyRole::Advisor), now).unwrap();
    repo.save(&ahead, Some(stale.version())).await.unwrap();

    let mut fresh_edit = fresh.clone();
    fresh_edit.add_party(party("landlord", PartyRole::Initiator), now).unwrap();
    let mut stale_edit = stale.clone();
    stale_edit.add_party(party("tenant", PartyRole::Respondent), now).unwrap();

    let result = repo
        .batch_update(vec![
            SessionUpdate {
                session: stale_edit,
                expected_version: stale.version(),
            },
            SessionUpdate {
                session: fresh_edit,
                expected_version: fresh.version(),
            },
        ])
        .await
        .unwrap();

    assert_eq!(result.updated, vec![fresh.id()]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].0, stale.id());
    assert!(result.failed[0].1.is_retryable());
    let kept = repo.get_by_id(&stale.id()).await.unwrap().unwrap();
    assert_eq!(kept.parties().next().map(|p| p.role()), Some(PartyRole::Advisor));
}

// =============================================================================
// Publish after save
// =============================================================================

/// Delegates to the in-memory store but refuses writes while offline.
struct FlakyRepository {
    inner: InMemoryNegotiationRepository,
    offline: AtomicBool,
}

impl FlakyRepository {
    fn new() -> Self {
        Self {
            inner: InMemoryNegotiationRepository::new(),
            offline: AtomicBool::new(false),
        }
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NegotiationRepository for FlakyRepository {
    async fn save(&self, session: &NegotiationSession, expected_version: Option<u64>) -> Result<(), DomainError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DomainError::new(ErrorCode::DatabaseError, "storage offline"));
        }
        self.inner.save(session, expected_version).await
    }

    async fn get_by_id(&self, id: &SessionId) -> Result<Option<NegotiationSession>, DomainError> {
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

#[tokio::test]
async fn failed_save_publishes_nothing() {
    let repo = Arc::new(FlakyRepository::new());
    let bus = Arc::new(InMemoryEventBus::new());

    let created = CreateSessionHandler::new(repo.clone(), bus.clone(), SessionConfiguration::default())
        .handle(CreateSessionCommand::new("Office lease", NegotiationType::Commercial), metadata())
        .await
        .unwrap();
    let session_id = created.session.id();
    let published_before = bus.event_count().await;
    assert_eq!(published_before, 1);

    repo.go_offline();
    let err = AddPartyHandler::new(repo.clone(), bus.clone())
        .handle(
            AddPartyCommand {
                session_id,
                party: party("landlord", PartyRole::Initiator),
            },
            metadata(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::DatabaseError);
    assert!(!err.is_retryable());
    assert_eq!(bus.event_count().await, published_before);
    assert!(!bus.has_event("negotiation.party_joined.v1").await);
    let stored = repo.get_by_id(&session_id).await.unwrap().unwrap();
    assert_eq!(stored.party_count(), 0);
    assert_eq!(stored.version(), created.session.version());
}
