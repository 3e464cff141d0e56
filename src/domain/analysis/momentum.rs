//! Negotiation momentum: trend, pace and engagement of responses.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Score, Timestamp};
use crate::domain::negotiation::{NegotiationPhase, ProposalResponse};

use super::NegotiationService;

/// A trend difference beyond this flips the direction.
const TREND_THRESHOLD: f64 = 0.1;
const RECENT_WINDOW_HOURS: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumDirection {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trajectory {
    LikelySuccess,
    Progressing,
    Stalled,
    AtRisk,
    Deadlocked,
    Uncertain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumAnalysis {
    pub score: Score,
    pub direction: MomentumDirection,
    /// Pace in [0, 1].
    pub velocity: f64,
    /// Mean acceptance weight in [0, 1].
    pub acceptance_rate: f64,
    pub trajectory: Trajectory,
    pub response_count: usize,
}

impl MomentumAnalysis {
    /// Momentum with nothing to measure yet.
    pub fn neutral() -> Self {
        Self {
            score: Score::NEUTRAL,
            direction: MomentumDirection::Neutral,
            velocity: 0.0,
            acceptance_rate: 0.0,
            trajectory: Trajectory::Uncertain,
            response_count: 0,
        }
    }
}

impl NegotiationService {
    /// Derives momentum from the responses received so far.
    ///
    /// # Algorithm
    /// Responses are ordered by timestamp. Direction compares the mean
    /// acceptance weight of the newer half against the older half.
    /// Velocity is `0.6 * share answered in the last 24h + 0.4 * share
    /// carrying comments or modifications`. The score is
    /// `100 * (0.5 * acceptance + 0.3 * velocity + 0.2 * phase bonus)`.
    ///
    /// # Edge Cases
    /// - No responses: neutral 50 and an uncertain trajectory
    /// - A single response: direction stays neutral
    pub fn calculate_momentum<'a>(
        &self,
        responses: impl IntoIterator<Item = &'a ProposalResponse>,
        phase: NegotiationPhase,
        now: Timestamp,
    ) -> MomentumAnalysis {
        let mut ordered: Vec<&ProposalResponse> = responses.into_iter().collect();
        if ordered.is_empty() {
            return MomentumAnalysis::neutral();
        }
        ordered.sort_by_key(|r| r.timestamp());

        let count = ordered.len() as f64;
        let acceptance_rate = acceptance(&ordered);
        let direction = direction(&ordered);

        let recent = ordered
            .iter()
            .filter(|r| now.hours_since(&r.timestamp()) <= RECENT_WINDOW_HOURS)
            .count() as f64;
        let rich = ordered.iter().filter(|r| r.is_rich()).count() as f64;
        let velocity = 0.6 * (recent / count) + 0.4 * (rich / count);

        let score = Score::from_fraction(0.5 * acceptance_rate + 0.3 * velocity + 0.2 * phase_bonus(phase));

        MomentumAnalysis {
            score,
            direction,
            velocity,
            acceptance_rate,
            trajectory: trajectory(score, direction, velocity, phase),
            response_count: ordered.len(),
        }
    }
}

fn acceptance(responses: &[&ProposalResponse]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    responses.iter().map(|r| r.response().acceptance_weight()).sum::<f64>() / responses.len() as f64
}

fn direction(ordered: &[&ProposalResponse]) -> MomentumDirection {
    if ordered.len() < 2 {
        return MomentumDirection::Neutral;
    }
    let (older, recent) = ordered.split_at(ordered.len() / 2);
    let trend = acceptance(recent) - acceptance(older);
    if trend > TREND_THRESHOLD {
        MomentumDirection::Positive
    } else if trend < -TREND_THRESHOLD {
        MomentumDirection::Negative
    } else {
        MomentumDirection::Neutral
    }
}

fn phase_bonus(phase: NegotiationPhase) -> f64 {
    match phase {
        NegotiationPhase::Bargaining | NegotiationPhase::Closing => 1.0,
        NegotiationPhase::Opening | NegotiationPhase::Implementation => 0.5,
        _ => 0.0,
    }
}

fn trajectory(score: Score, direction: MomentumDirection, velocity: f64, phase: NegotiationPhase) -> Trajectory {
    let score = score.value();
    let late_phase = matches!(phase, NegotiationPhase::Bargaining | NegotiationPhase::Closing);
    match direction {
        MomentumDirection::Positive if score >= 70.0 && late_phase => Trajectory::LikelySuccess,
        MomentumDirection::Negative if score < 30.0 => Trajectory::Deadlocked,
        MomentumDirection::Negative => Trajectory::AtRisk,
        _ if score < 40.0 => Trajectory::AtRisk,
        MomentumDirection::Positive => Trajectory::Progressing,
        _ if velocity < 0.2 => Trajectory::Stalled,
        _ => Trajectory::Uncertain,
    }
}
