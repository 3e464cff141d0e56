//! Composite session health score.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Score, SessionId, Timestamp};
use crate::domain::negotiation::{NegotiationPhase, NegotiationSession};

use super::{Conflict, MomentumAnalysis, NegotiationService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Watch,
    Critical,
}

impl HealthStatus {
    fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            HealthStatus::Healthy
        } else if score >= 40.0 {
            HealthStatus::Watch
        } else {
            HealthStatus::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHealthReport {
    pub session_id: SessionId,
    pub health_score: Score,
    pub status: HealthStatus,
    pub phase: NegotiationPhase,
    pub hours_since_activity: f64,
    pub conflicts: Vec<Conflict>,
    pub momentum: MomentumAnalysis,
    pub recommendations: Vec<String>,
    pub assessed_at: Timestamp,
}

impl NegotiationService {
    /// Scores a session's health from its conflicts, momentum and activity.
    ///
    /// # Algorithm
    /// Start at 100, then:
    /// - subtract 5/10/15/20 per conflict by severity
    /// - subtract 15 for momentum below 30, 5 below 50, add 5 above 80
    /// - subtract 20 after the inactive threshold, 10 after the idle one
    /// - subtract 15 when bargaining or closing without an active proposal
    ///
    /// The result is clamped to [0, 100].
    pub fn assess_health(
        &self,
        session: &NegotiationSession,
        conflicts: Vec<Conflict>,
        momentum: MomentumAnalysis,
        now: Timestamp,
    ) -> SessionHealthReport {
        let thresholds = &self.settings().health;
        let mut score = 100.0;
        let mut recommendations = Vec::new();

        for conflict in &conflicts {
            score -= conflict.severity.health_penalty();
            if let Some(first) = conflict.resolution_suggestions.first() {
                recommendations.push(first.clone());
            }
        }

        let momentum_score = momentum.score.value();
        if momentum_score < 30.0 {
            score -= 15.0;
            recommendations.push("Momentum is low: consider a revised proposal or a mediator".to_string());
        } else if momentum_score < 50.0 {
            score -= 5.0;
        } else if momentum_score > 80.0 {
            score += 5.0;
        }

        let idle = now.hours_since(&session.status().last_activity_at()).max(0.0);
        if idle > thresholds.inactive_hours {
            score -= 20.0;
            recommendations.push(format!("No activity for {:.0} hours: re-engage the parties", idle));
        } else if idle > thresholds.idle_hours {
            score -= 10.0;
        }

        let phase = session.phase();
        if matches!(phase, NegotiationPhase::Bargaining | NegotiationPhase::Closing)
            && session.active_proposal_count() == 0
        {
            score -= 15.0;
            recommendations.push("No proposal on the table: submit a new or counter proposal".to_string());
        }

        let health_score = Score::new(score);
        SessionHealthReport {
            session_id: session.id(),
            status: HealthStatus::from_score(health_score.value()),
            health_score,
            phase,
            hours_since_activity: idle,
            conflicts,
            momentum,
            recommendations,
            assessed_at: now,
        }
    }
}
