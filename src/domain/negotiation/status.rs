//! NegotiationStatus value object - phase, outcome and lifecycle timestamps.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, ValidationError};

use super::{NegotiationOutcome, NegotiationPhase, TerminationReason};

/// Immutable snapshot of where a negotiation stands.
///
/// # Invariants
///
/// - `started_at <= last_activity_at`
/// - `started_at <=` any completion time
/// - `phase == Terminated` implies a non-pending outcome, a termination
///   reason and an actual completion time
/// - a non-terminated status has a pending outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NegotiationStatusRecord")]
pub struct NegotiationStatus {
    phase: NegotiationPhase,
    outcome: NegotiationOutcome,
    started_at: Timestamp,
    last_activity_at: Timestamp,
    expected_completion_at: Option<Timestamp>,
    actual_completion_at: Option<Timestamp>,
    termination_reason: Option<TerminationReason>,
}

#[derive(Deserialize)]
struct NegotiationStatusRecord {
    phase: NegotiationPhase,
    outcome: NegotiationOutcome,
    started_at: Timestamp,
    last_activity_at: Timestamp,
    #[serde(default)]
    expected_completion_at: Option<Timestamp>,
    #[serde(default)]
    actual_completion_at: Option<Timestamp>,
    #[serde(default)]
    termination_reason: Option<TerminationReason>,
}

impl TryFrom<NegotiationStatusRecord> for NegotiationStatus {
    type Error = ValidationError;

    fn try_from(record: NegotiationStatusRecord) -> Result<Self, Self::Error> {
        Self::try_new(
            record.phase,
            record.outcome,
            record.started_at,
            record.last_activity_at,
            record.expected_completion_at,
            record.actual_completion_at,
            record.termination_reason,
        )
    }
}

impl NegotiationStatus {
    /// Creates the initial status of a fresh negotiation.
    pub fn initial(
        started_at: Timestamp,
        expected_completion_at: Option<Timestamp>,
    ) -> Result<Self, ValidationError> {
        Self::try_new(
            NegotiationPhase::Initiation,
            NegotiationOutcome::Pending,
            started_at,
            started_at,
            expected_completion_at,
            None,
            None,
        )
    }

    /// Creates a status from parts, validating every invariant.
    pub fn try_new(
        phase: NegotiationPhase,
        outcome: NegotiationOutcome,
        started_at: Timestamp,
        last_activity_at: Timestamp,
        expected_completion_at: Option<Timestamp>,
        actual_completion_at: Option<Timestamp>,
        termination_reason: Option<TerminationReason>,
    ) -> Result<Self, ValidationError> {
        let status = Self {
            phase,
            outcome,
            started_at,
            last_activity_at,
            expected_completion_at,
            actual_completion_at,
            termination_reason,
        };
        status.validate()?;
        Ok(status)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.last_activity_at.is_before(&self.started_at) {
            return Err(ValidationError::invariant(
                "status.timestamps",
                "last_activity_at precedes started_at",
            ));
        }
        for completion in [self.expected_completion_at, self.actual_completion_at]
            .into_iter()
            .flatten()
        {
            if completion.is_before(&self.started_at) {
                return Err(ValidationError::invariant(
                    "status.timestamps",
                    "completion time precedes started_at",
                ));
            }
        }

        if self.phase == NegotiationPhase::Terminated {
            if self.outcome.is_pending() {
                return Err(ValidationError::invariant(
                    "status.terminated",
                    "terminated negotiation must have an outcome",
                ));
            }
            if self.termination_reason.is_none() {
                return Err(ValidationError::invariant(
                    "status.terminated",
                    "terminated negotiation must have a termination reason",
                ));
            }
            if self.actual_completion_at.is_none() {
                return Err(ValidationError::invariant(
                    "status.terminated",
                    "terminated negotiation must have a completion time",
                ));
            }
        } else if !self.outcome.is_pending() {
            return Err(ValidationError::invariant(
                "status.outcome",
                format!("outcome {} requires a terminated negotiation", self.outcome),
            ));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    pub fn outcome(&self) -> NegotiationOutcome {
        self.outcome
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn last_activity_at(&self) -> Timestamp {
        self.last_activity_at
    }

    pub fn expected_completion_at(&self) -> Option<Timestamp> {
        self.expected_completion_at
    }

    pub fn actual_completion_at(&self) -> Option<Timestamp> {
        self.actual_completion_at
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.termination_reason
    }

    /// Returns true while the negotiation has not reached `Terminated`.
    pub fn is_active(&self) -> bool {
        self.phase != NegotiationPhase::Terminated
    }

    /// Returns true if `now` is past the expected completion time.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.expected_completion_at
            .map(|expected| now.is_after(&expected))
            .unwrap_or(false)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Updates (return new instances)
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns a copy with a new activity timestamp (never moving backwards).
    pub fn touched(&self, at: Timestamp) -> Self {
        let mut next = self.clone();
        next.last_activity_at = at.max(self.last_activity_at);
        next
    }

    /// Returns a copy in a new, non-terminal phase.
    pub fn with_phase(&self, phase: NegotiationPhase, at: Timestamp) -> Result<Self, ValidationError> {
        if phase == NegotiationPhase::Terminated {
            return Err(ValidationError::invariant(
                "status.phase",
                "use complete_with_outcome to terminate",
            ));
        }
        let mut next = self.touched(at);
        next.phase = phase;
        next.validate()?;
        Ok(next)
    }

    /// Returns a copy with a new expected completion time.
    pub fn with_expected_completion(&self, at: Option<Timestamp>) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        next.expected_completion_at = at;
        next.validate()?;
        Ok(next)
    }

    /// Returns a terminated copy.
    ///
    /// Positive outcomes are only valid from `Closing` or `Implementation`.
    /// `actual_completion_at` and `last_activity_at` are both set to `at`.
    pub fn complete_with_outcome(
        &self,
        outcome: NegotiationOutcome,
        reason: TerminationReason,
        at: Timestamp,
    ) -> Result<Self, ValidationError> {
        if !self.is_active() {
            return Err(ValidationError::invariant(
                "status.terminated",
                "negotiation already terminated",
            ));
        }
        if outcome.is_pending() {
            return Err(ValidationError::invariant(
                "status.outcome",
                "cannot complete with a pending outcome",
            ));
        }
        if outcome.is_positive() && !self.phase.allows_positive_outcome() {
            return Err(ValidationError::invariant(
                "status.outcome",
                format!("outcome {} is only valid from CLOSING or IMPLEMENTATION, not {}", outcome, self.phase),
            ));
        }
        let completed_at = at.max(self.last_activity_at);
        Self::try_new(
            NegotiationPhase::Terminated,
            outcome,
            self.started_at,
            completed_at,
            self.expected_completion_at,
            Some(completed_at),
            Some(reason),
        )
    }
}
