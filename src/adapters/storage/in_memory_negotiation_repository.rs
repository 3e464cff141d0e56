//! In-memory negotiation repository.
//!
//! Keeps committed sessions in a map guarded by a tokio `RwLock`. Used by
//! the integration tests and by embedders that do not need durability.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    ActorId, DomainError, EntityId, ErrorCode, SessionId, Timestamp,
};
use crate::domain::negotiation::{NegotiationPhase, NegotiationSession, NegotiationType};
use crate::ports::{
    BatchUpdateResult, NegotiationRepository, Paging, RepositoryStatistics, SessionCriteria,
    SessionOrdering, SessionPage, SessionSortField, SessionUpdate,
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryNegotiationRepository {
    sessions: Arc<RwLock<HashMap<SessionId, NegotiationSession>>>,
}

impl InMemoryNegotiationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    async fn matching(&self, criteria: &SessionCriteria) -> Vec<NegotiationSession> {
        let sessions = self.sessions.read().await;
        let mut found: Vec<NegotiationSession> = sessions
            .values()
            .filter(|s| criteria.matches(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| compare(a, b, SessionOrdering::default()));
        found
    }
}

/// Version check and insert under an already-held write lock.
fn store(
    sessions: &mut HashMap<SessionId, NegotiationSession>,
    session: &NegotiationSession,
    expected_version: Option<u64>,
) -> Result<(), DomainError> {
    match (sessions.get(&session.id()), expected_version) {
        (Some(existing), None) => {
            return Err(DomainError::concurrency_conflict(0, existing.version())
                .with_detail("session_id", session.id().to_string()));
        }
        (None, Some(_)) => {
            return Err(DomainError::not_found(ErrorCode::SessionNotFound, "Session", session.id()));
        }
        (Some(existing), Some(expected)) if existing.version() != expected => {
            return Err(DomainError::concurrency_conflict(expected, existing.version())
                .with_detail("session_id", session.id().to_string()));
        }
        _ => {}
    }
    let mut committed = session.clone();
    committed.mark_committed();
    sessions.insert(session.id(), committed);
    Ok(())
}

fn compare(a: &NegotiationSession, b: &NegotiationSession, ordering: SessionOrdering) -> Ordering {
    let by_field = match ordering.field {
        SessionSortField::CreatedAt => a.created_at().cmp(&b.created_at()),
        SessionSortField::LastActivity => a
            .status()
            .last_activity_at()
            .cmp(&b.status().last_activity_at()),
        SessionSortField::Title => a
            .metadata()
            .title
            .to_lowercase()
            .cmp(&b.metadata().title.to_lowercase()),
    };
    let by_field = if ordering.descending { by_field.reverse() } else { by_field };
    by_field.then_with(|| a.id().cmp(&b.id()))
}

#[async_trait]
impl NegotiationRepository for InMemoryNegotiationRepository {
    async fn save(
        &self,
        session: &NegotiationSession,
        expected_version: Option<u64>,
    ) -> Result<(), DomainError> {
        let mut sessions = self.sessions.write().await;
        store(&mut sessions, session, expected_version)
    }

    async fn get_by_id(&self, id: &SessionId) -> Result<Option<NegotiationSession>, DomainError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn find_by_filters(
        &self,
        criteria: &SessionCriteria,
        paging: Paging,
        ordering: SessionOrdering,
    ) -> Result<SessionPage, DomainError> {
        let sessions = self.sessions.read().await;
        let mut found: Vec<&NegotiationSession> = sessions.values().filter(|s| criteria.matches(s)).collect();
        found.sort_by(|a, b| compare(a, b, ordering));

        let total = found.len();
        let items: Vec<NegotiationSession> = found
            .into_iter()
            .skip(paging.offset)
            .take(paging.limit)
            .cloned()
            .collect();
        Ok(SessionPage {
            has_more: paging.offset + items.len() < total,
            total: total as u64,
            items,
        })
    }

    async fn find_by_creator(&self, creator: &ActorId) -> Result<Vec<NegotiationSession>, DomainError> {
        Ok(self
            .matching(&SessionCriteria::default().created_by(creator.clone()))
            .await)
    }

    async fn find_by_participant(&self, entity: &EntityId) -> Result<Vec<NegotiationSession>, DomainError> {
        Ok(self
            .matching(&SessionCriteria::default().with_participant(entity.clone()))
            .await)
    }

    async fn find_active(&self) -> Result<Vec<NegotiationSession>, DomainError> {
        Ok(self.matching(&SessionCriteria::active()).await)
    }

    async fn find_by_status(&self, phase: NegotiationPhase) -> Result<Vec<NegotiationSession>, DomainError> {
        Ok(self.matching(&SessionCriteria::default().with_phase(phase)).await)
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<NegotiationSession>, DomainError> {
        Ok(self.matching(&SessionCriteria::default().with_domain(domain)).await)
    }

    async fn find_by_type(
        &self,
        negotiation_type: NegotiationType,
    ) -> Result<Vec<NegotiationSession>, DomainError> {
        let criteria = SessionCriteria {
            negotiation_type: Some(negotiation_type),
            ..SessionCriteria::default()
        };
        Ok(self.matching(&criteria).await)
    }

    async fn find_requiring_attention(
        &self,
        window_hours: u32,
        now: Timestamp,
    ) -> Result<Vec<NegotiationSession>, DomainError> {
        let horizon = now.plus_hours(i64::from(window_hours));
        let mut found: Vec<NegotiationSession> = self
            .matching(&SessionCriteria::active())
            .await
            .into_iter()
            .filter(|s| {
                s.status()
                    .expected_completion_at()
                    .is_some_and(|due| !due.is_after(&horizon))
            })
            .collect();
        // most urgent first
        found.sort_by_key(|s| s.status().expected_completion_at());
        Ok(found)
    }

    async fn count_by_criteria(&self, criteria: &SessionCriteria) -> Result<u64, DomainError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().filter(|s| criteria.matches(s)).count() as u64)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), DomainError> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(ErrorCode::SessionNotFound, "Session", id))
    }

    async fn exists(&self, id: &SessionId) -> Result<bool, DomainError> {
        Ok(self.sessions.read().await.contains_key(id))
    }

    async fn statistics(&self) -> Result<RepositoryStatistics, DomainError> {
        let sessions = self.sessions.read().await;
        let mut stats = RepositoryStatistics::default();
        let mut parties = 0usize;
        for session in sessions.values() {
            stats.total_sessions += 1;
            if session.is_active() {
                stats.active_sessions += 1;
            }
            *stats.by_phase.entry(session.phase()).or_insert(0) += 1;
            *stats.by_outcome.entry(session.outcome().to_string()).or_insert(0) += 1;
            parties += session.party_count();
        }
        if stats.total_sessions > 0 {
            stats.average_party_count = parties as f64 / stats.total_sessions as f64;
        }
        Ok(stats)
    }

    async fn find_by_date_range(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<NegotiationSession>, DomainError> {
        let criteria = SessionCriteria {
            created_after: Some(from),
            created_before: Some(to),
            ..SessionCriteria::default()
        };
        Ok(self.matching(&criteria).await)
    }

    async fn batch_update(&self, updates: Vec<SessionUpdate>) -> Result<BatchUpdateResult, DomainError> {
        let mut sessions = self.sessions.write().await;
        let mut result = BatchUpdateResult::default();
        for update in updates {
            let id = update.session.id();
            match store(&mut sessions, &update.session, Some(update.expected_version)) {
                Ok(()) => result.updated.push(id),
                Err(e) => result.failed.push((id, e)),
            }
        }
        Ok(result)
    }
}
