//! TimeoutSweepHandler - polls deadlines across all sessions near expiry.
//!
//! Meant to be driven by an external scheduler. Candidate sessions are swept
//! concurrently: each has stale proposals expired, has its deadline checked,
//! and is committed on its own. One failing session never stops the sweep.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::domain::foundation::{CommandMetadata, DomainError, SessionId};
use crate::domain::negotiation::{NegotiationSession, TimeoutCheck};
use crate::ports::{EventPublisher, NegotiationRepository};

use super::support::commit;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeoutSweepReport {
    pub checked: usize,
    pub warned: Vec<SessionId>,
    pub timed_out: Vec<SessionId>,
    pub expired_proposals: usize,
    #[serde(skip)]
    pub failures: Vec<(SessionId, DomainError)>,
}

impl TimeoutSweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct TimeoutSweepHandler {
    repository: Arc<dyn NegotiationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    attention_window_hours: u32,
}

impl TimeoutSweepHandler {
    pub fn new(
        repository: Arc<dyn NegotiationRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        attention_window_hours: u32,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            attention_window_hours,
        }
    }

    /// Sweeps as of `metadata.issued_at`.
    ///
    /// # Errors
    ///
    /// Only a failure to list candidate sessions is returned; per-session
    /// failures land in the report.
    pub async fn handle(&self, metadata: CommandMetadata) -> Result<TimeoutSweepReport, DomainError> {
        let now = metadata.issued_at;
        let candidates = self
            .repository
            .find_requiring_attention(self.attention_window_hours, now)
            .await?;

        let ids: Vec<SessionId> = candidates.iter().map(|s| s.id()).collect();
        let outcomes = join_all(candidates.into_iter().map(|s| self.sweep_one(s, &metadata))).await;

        let mut report = TimeoutSweepReport::default();
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            report.checked += 1;
            match outcome {
                Ok((check, expired)) => {
                    report.expired_proposals += expired;
                    match check {
                        TimeoutCheck::WarningIssued { .. } => report.warned.push(id),
                        TimeoutCheck::TimedOut => report.timed_out.push(id),
                        TimeoutCheck::Inactive | TimeoutCheck::OnTrack => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "timeout sweep failed for session");
                    report.failures.push((id, e));
                }
            }
        }

        tracing::info!(
            checked = report.checked,
            warned = report.warned.len(),
            timed_out = report.timed_out.len(),
            failures = report.failures.len(),
            "timeout sweep finished"
        );
        Ok(report)
    }

    async fn sweep_one(
        &self,
        mut session: NegotiationSession,
        metadata: &CommandMetadata,
    ) -> Result<(TimeoutCheck, usize), DomainError> {
        let expected = session.version();
        let expired = session.expire_proposals(metadata.issued_at).len();
        let check = session.check_timeout(metadata.issued_at)?;
        commit(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            session,
            Some(expected),
            &metadata.child(),
        )
        .await?;
        Ok((check, expired))
    }
}
