//! Negotiation repository port.
//!
//! Persistence boundary for `NegotiationSession` aggregates. The aggregate
//! never persists itself; handlers load it, mutate it and hand it back here.
//!
//! # Design
//!
//! - **Optimistic concurrency**: `save` takes the version the caller loaded
//!   and fails with `ConcurrencyConflict` when the stored version differs
//! - **Committed state only**: adapters store sessions without their pending
//!   events; publishing is the caller's job after a successful save
//! - **Query helpers**: the `find_by_*` methods are shorthands over
//!   `find_by_filters` that adapters may index separately

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ActorId, DomainError, EntityId, SessionId, Timestamp};
use crate::domain::negotiation::{NegotiationPhase, NegotiationSession, NegotiationType};

/// Repository port for negotiation sessions.
#[async_trait]
pub trait NegotiationRepository: Send + Sync {
    /// Persist a session.
    ///
    /// `expected_version` is `None` for a brand-new session and otherwise the
    /// version the caller loaded before mutating.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict` when the stored version differs from
    ///   `expected_version`, or a new session's id is already taken
    /// - `DatabaseError` on persistence failure
    async fn save(
        &self,
        session: &NegotiationSession,
        expected_version: Option<u64>,
    ) -> Result<(), DomainError>;

    /// Returns `None` if not found.
    async fn get_by_id(&self, id: &SessionId) -> Result<Option<NegotiationSession>, DomainError>;

    async fn find_by_filters(
        &self,
        criteria: &SessionCriteria,
        paging: Paging,
        ordering: SessionOrdering,
    ) -> Result<SessionPage, DomainError>;

    async fn find_by_creator(&self, creator: &ActorId) -> Result<Vec<NegotiationSession>, DomainError>;

    /// Sessions in which any party is backed by the given entity.
    async fn find_by_participant(&self, entity: &EntityId) -> Result<Vec<NegotiationSession>, DomainError>;

    async fn find_active(&self) -> Result<Vec<NegotiationSession>, DomainError>;

    async fn find_by_status(&self, phase: NegotiationPhase) -> Result<Vec<NegotiationSession>, DomainError>;

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<NegotiationSession>, DomainError>;

    async fn find_by_type(
        &self,
        negotiation_type: NegotiationType,
    ) -> Result<Vec<NegotiationSession>, DomainError>;

    /// Active sessions whose expected completion falls within `window_hours`
    /// of `now`, or has already passed.
    async fn find_requiring_attention(
        &self,
        window_hours: u32,
        now: Timestamp,
    ) -> Result<Vec<NegotiationSession>, DomainError>;

    async fn count_by_criteria(&self, criteria: &SessionCriteria) -> Result<u64, DomainError>;

    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    async fn delete(&self, id: &SessionId) -> Result<(), DomainError>;

    async fn exists(&self, id: &SessionId) -> Result<bool, DomainError>;

    async fn statistics(&self) -> Result<RepositoryStatistics, DomainError>;

    /// Sessions created in `[from, to)`.
    async fn find_by_date_range(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<NegotiationSession>, DomainError>;

    /// Saves several sessions, each against its own expected version.
    ///
    /// A failing item does not prevent the others from being saved.
    async fn batch_update(&self, updates: Vec<SessionUpdate>) -> Result<BatchUpdateResult, DomainError>;
}

/// Filter for session queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCriteria {
    pub created_by: Option<ActorId>,
    pub participant: Option<EntityId>,
    pub phase: Option<NegotiationPhase>,
    pub domain: Option<String>,
    pub negotiation_type: Option<NegotiationType>,
    pub active_only: bool,
    pub created_after: Option<Timestamp>,
    pub created_before: Option<Timestamp>,
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
}

impl SessionCriteria {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn with_phase(mut self, phase: NegotiationPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn created_by(mut self, actor: ActorId) -> Self {
        self.created_by = Some(actor);
        self
    }

    pub fn with_participant(mut self, entity: EntityId) -> Self {
        self.participant = Some(entity);
        self
    }

    /// True when the session satisfies every set field.
    pub fn matches(&self, session: &NegotiationSession) -> bool {
        let metadata = session.metadata();
        self.created_by.as_ref().map_or(true, |a| session.created_by() == a)
            && self
                .participant
                .as_ref()
                .map_or(true, |e| session.parties().any(|p| p.entity_id() == e))
            && self.phase.map_or(true, |p| session.phase() == p)
            && self.domain.as_deref().map_or(true, |d| {
                metadata.domain.as_deref().is_some_and(|own| own.eq_ignore_ascii_case(d))
            })
            && self.negotiation_type.map_or(true, |t| metadata.negotiation_type == t)
            && (!self.active_only || session.is_active())
            && self.created_after.map_or(true, |t| !session.created_at().is_before(&t))
            && self.created_before.map_or(true, |t| session.created_at().is_before(&t))
            && self.title_contains.as_deref().map_or(true, |needle| {
                metadata.title.to_lowercase().contains(&needle.to_lowercase())
            })
    }
}

/// Offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub limit: usize,
    pub offset: usize,
}

impl Paging {
    /// One-based page numbers; page 0 is treated as page 1.
    pub fn page(page: usize, per_page: usize) -> Self {
        Self {
            limit: per_page,
            offset: page.saturating_sub(1) * per_page,
        }
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self { limit: 50, offset: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionSortField {
    #[default]
    CreatedAt,
    LastActivity,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOrdering {
    pub field: SessionSortField,
    pub descending: bool,
}

impl Default for SessionOrdering {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: SessionSortField::CreatedAt,
            descending: true,
        }
    }
}

/// One page of sessions.
#[derive(Debug, Clone)]
pub struct SessionPage {
    pub items: Vec<NegotiationSession>,
    /// Total number of matching sessions.
    pub total: u64,
    pub has_more: bool,
}

/// Aggregate counts over all stored sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStatistics {
    pub total_sessions: u64,
    pub active_sessions: u64,
    pub by_phase: BTreeMap<NegotiationPhase, u64>,
    /// Keyed by outcome display name, e.g. `AGREEMENT_REACHED`.
    pub by_outcome: BTreeMap<String, u64>,
    pub average_party_count: f64,
}

/// A session to save with the version it was loaded at.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub session: NegotiationSession,
    pub expected_version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct BatchUpdateResult {
    pub updated: Vec<SessionId>,
    pub failed: Vec<(SessionId, DomainError)>,
}

impl BatchUpdateResult {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::negotiation::{SessionConfiguration, SessionMetadata};

    #[test]
    fn negotiation_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn NegotiationRepository) {}
    }

    fn session(title: &str, domain: Option<&str>) -> NegotiationSession {
        let mut metadata = SessionMetadata::new(title, NegotiationType::Procurement).unwrap();
        if let Some(d) = domain {
            metadata = metadata.with_domain(d);
        }
        NegotiationSession::create(
            SessionId::new(),
            metadata,
            SessionConfiguration::default(),
            ActorId::new("buyer-team").unwrap(),
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn default_criteria_match_everything() {
        assert!(SessionCriteria::default().matches(&session("Laptops", None)));
    }

    #[test]
    fn domain_and_title_filters() {
        let s = session("Laptop supply", Some("Hardware"));
        assert!(SessionCriteria::default().with_domain("hardware").matches(&s));
        assert!(!SessionCriteria::default().with_domain("legal").matches(&s));

        let by_title = SessionCriteria {
            title_contains: Some("LAPTOP".to_string()),
            ..SessionCriteria::default()
        };
        assert!(by_title.matches(&s));
    }

    #[test]
    fn creator_and_phase_filters() {
        let s = session("Laptops", None);
        assert!(SessionCriteria::active()
            .created_by(ActorId::new("buyer-team").unwrap())
            .with_phase(NegotiationPhase::Initiation)
            .matches(&s));
        assert!(!SessionCriteria::default()
            .created_by(ActorId::new("someone-else").unwrap())
            .matches(&s));
    }

    #[test]
    fn paging_pages_are_one_based() {
        assert_eq!(Paging::page(1, 20), Paging { limit: 20, offset: 0 });
        assert_eq!(Paging::page(3, 20), Paging { limit: 20, offset: 40 });
        assert_eq!(Paging::page(0, 20).offset, 0);
    }
}
