//! Negotiation phase, outcome, and termination reason enums.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle phase of a negotiation session.
///
/// Phases advance strictly one step forward; any non-terminal phase may
/// jump directly to `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationPhase {
    #[default]
    Initiation,
    Preparation,
    Opening,
    Bargaining,
    Closing,
    Implementation,
    Terminated,
}

impl NegotiationPhase {
    /// All phases in table order.
    pub const ALL: [NegotiationPhase; 7] = [
        NegotiationPhase::Initiation,
        NegotiationPhase::Preparation,
        NegotiationPhase::Opening,
        NegotiationPhase::Bargaining,
        NegotiationPhase::Closing,
        NegotiationPhase::Implementation,
        NegotiationPhase::Terminated,
    ];

    /// The single forward successor, if any (excluding the jump to Terminated).
    pub fn next(&self) -> Option<NegotiationPhase> {
        use NegotiationPhase::*;
        match self {
            Initiation => Some(Preparation),
            Preparation => Some(Opening),
            Opening => Some(Bargaining),
            Bargaining => Some(Closing),
            Closing => Some(Implementation),
            Implementation | Terminated => None,
        }
    }

    /// Phases in which proposals may be submitted.
    pub fn accepts_proposals(&self) -> bool {
        matches!(
            self,
            NegotiationPhase::Opening | NegotiationPhase::Bargaining | NegotiationPhase::Closing
        )
    }

    /// Phases from which a positive outcome can be recorded.
    pub fn allows_positive_outcome(&self) -> bool {
        matches!(self, NegotiationPhase::Closing | NegotiationPhase::Implementation)
    }

    /// Zero-based position in the phase table.
    pub fn ordinal(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }
}

impl StateMachine for NegotiationPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        if *self == NegotiationPhase::Terminated {
            return false;
        }
        *target == NegotiationPhase::Terminated || self.next() == Some(*target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match (self, self.next()) {
            (NegotiationPhase::Terminated, _) => vec![],
            (_, Some(next)) => vec![next, NegotiationPhase::Terminated],
            (_, None) => vec![NegotiationPhase::Terminated],
        }
    }
}

impl fmt::Display for NegotiationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NegotiationPhase::Initiation => "INITIATION",
            NegotiationPhase::Preparation => "PREPARATION",
            NegotiationPhase::Opening => "OPENING",
            NegotiationPhase::Bargaining => "BARGAINING",
            NegotiationPhase::Closing => "CLOSING",
            NegotiationPhase::Implementation => "IMPLEMENTATION",
            NegotiationPhase::Terminated => "TERMINATED",
        };
        write!(f, "{}", s)
    }
}

/// How a negotiation ended (or `Pending` while it runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationOutcome {
    #[default]
    Pending,
    AgreementReached,
    PartialAgreement,
    NoAgreement,
    Withdrawn,
    Timeout,
    Cancelled,
}

impl NegotiationOutcome {
    /// Agreement and partial agreement are the positive outcomes.
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            NegotiationOutcome::AgreementReached | NegotiationOutcome::PartialAgreement
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, NegotiationOutcome::Pending)
    }
}

impl fmt::Display for NegotiationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NegotiationOutcome::Pending => "PENDING",
            NegotiationOutcome::AgreementReached => "AGREEMENT_REACHED",
            NegotiationOutcome::PartialAgreement => "PARTIAL_AGREEMENT",
            NegotiationOutcome::NoAgreement => "NO_AGREEMENT",
            NegotiationOutcome::Withdrawn => "WITHDRAWN",
            NegotiationOutcome::Timeout => "TIMEOUT",
            NegotiationOutcome::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Why a negotiation was terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    MutualAgreement,
    PartyWithdrawal,
    TimeoutExceeded,
    Deadlock,
    ManualTermination,
    ExternalIntervention,
    InsufficientParticipation,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::MutualAgreement => "MUTUAL_AGREEMENT",
            TerminationReason::PartyWithdrawal => "PARTY_WITHDRAWAL",
            TerminationReason::TimeoutExceeded => "TIMEOUT_EXCEEDED",
            TerminationReason::Deadlock => "DEADLOCK",
            TerminationReason::ManualTermination => "MANUAL_TERMINATION",
            TerminationReason::ExternalIntervention => "EXTERNAL_INTERVENTION",
            TerminationReason::InsufficientParticipation => "INSUFFICIENT_PARTICIPATION",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NegotiationPhase::*;

    #[test]
    fn forward_steps_are_valid() {
        assert!(Initiation.can_transition_to(&Preparation));
        assert!(Preparation.can_transition_to(&Opening));
        assert!(Opening.can_transition_to(&Bargaining));
        assert!(Bargaining.can_transition_to(&Closing));
        assert!(Closing.can_transition_to(&Implementation));
    }

    #[test]
    fn skips_and_backward_moves_are_invalid() {
        assert!(!Initiation.can_transition_to(&Opening));
        assert!(!Bargaining.can_transition_to(&Opening));
        assert!(!Closing.can_transition_to(&Closing));
        assert!(!Implementation.can_transition_to(&Initiation));
    }

    #[test]
    fn every_non_terminal_phase_can_terminate() {
        for phase in NegotiationPhase::ALL.iter().filter(|p| **p != Terminated) {
            assert!(phase.can_transition_to(&Terminated), "{:?}", phase);
        }
    }

    #[test]
    fn terminated_is_terminal() {
        assert!(Terminated.is_terminal());
        for phase in NegotiationPhase::ALL {
            assert!(!Terminated.can_transition_to(&phase));
        }
    }

    #[test]
    fn can_transition_is_consistent_with_valid_transitions() {
        for from in NegotiationPhase::ALL {
            for to in NegotiationPhase::ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn outcome_serializes_screaming_snake() {
        let json = serde_json::to_string(&NegotiationOutcome::AgreementReached).unwrap();
        assert_eq!(json, "\"AGREEMENT_REACHED\"");
        assert_eq!(
            serde_json::to_string(&TerminationReason::TimeoutExceeded).unwrap(),
            "\"TIMEOUT_EXCEEDED\""
        );
    }

    #[test]
    fn positive_outcomes() {
        assert!(NegotiationOutcome::AgreementReached.is_positive());
        assert!(NegotiationOutcome::PartialAgreement.is_positive());
        assert!(!NegotiationOutcome::Timeout.is_positive());
        assert!(!NegotiationOutcome::Pending.is_positive());
    }
}
