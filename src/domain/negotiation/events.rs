//! Negotiation domain events.
//!
//! Every event carries the session id, a stable event id and the time it
//! occurred. The payload is an internally tagged enum so consumers can route
//! on `type` without knowing every variant.

use serde::{Deserialize, Serialize};

use crate::domain::analysis::{ConflictSeverity, ConflictType, MomentumDirection, Trajectory};
use crate::domain::foundation::{
    ActorId, DomainEvent, EntityId, EventId, PartyId, ProposalId, ResponseId, SessionId, Timestamp,
};

use super::{
    AuthorityLevel, NegotiationOutcome, NegotiationPhase, NegotiationType, PartyRole,
    ProposalType, ResponseType, SessionConfiguration, TerminationReason,
};

/// An event emitted by a [`NegotiationSession`](super::NegotiationSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationEvent {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub occurred_at: Timestamp,
    #[serde(flatten)]
    pub payload: NegotiationEventPayload,
}

impl NegotiationEvent {
    pub fn new(session_id: SessionId, occurred_at: Timestamp, payload: NegotiationEventPayload) -> Self {
        Self {
            event_id: EventId::new(),
            session_id,
            occurred_at,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NegotiationEventPayload {
    SessionCreated {
        title: String,
        domain: Option<String>,
        negotiation_type: NegotiationType,
        created_by: ActorId,
        configuration: SessionConfiguration,
    },

    PartyJoined {
        party_id: PartyId,
        entity_id: EntityId,
        role: PartyRole,
        authority: AuthorityLevel,
    },

    PartyLeft {
        party_id: PartyId,
        reason: Option<String>,
    },

    ProposalSubmitted {
        proposal_id: ProposalId,
        submitted_by: PartyId,
        proposal_type: ProposalType,
        term_count: usize,
    },

    ProposalWithdrawn {
        proposal_id: ProposalId,
        withdrawn_by: PartyId,
    },

    ProposalExpired {
        proposal_id: ProposalId,
    },

    CounterProposalSubmitted {
        proposal_id: ProposalId,
        counter_to: ProposalId,
        submitted_by: PartyId,
    },

    ResponseReceived {
        response_id: ResponseId,
        proposal_id: ProposalId,
        responder: PartyId,
        response: ResponseType,
    },

    PhaseAdvanced {
        from: NegotiationPhase,
        to: NegotiationPhase,
        forced: bool,
    },

    /// Positive termination.
    Completed {
        outcome: NegotiationOutcome,
        reason: TerminationReason,
        completed_by: Option<ActorId>,
    },

    /// Non-positive termination.
    Terminated {
        outcome: NegotiationOutcome,
        reason: TerminationReason,
        terminated_by: Option<ActorId>,
    },

    TimeoutWarning {
        expected_completion_at: Timestamp,
        hours_remaining: f64,
    },

    ConflictDetected {
        conflict_type: ConflictType,
        severity: ConflictSeverity,
        parties: Vec<PartyId>,
        description: String,
    },

    DeadlockDetected {
        momentum_score: f64,
    },

    BreakthroughAchieved {
        momentum_score: f64,
    },

    MetricsUpdated {
        momentum_score: f64,
        direction: MomentumDirection,
        trajectory: Trajectory,
    },

    PartyCapabilityUpdated {
        party_id: PartyId,
        capabilities: Vec<String>,
    },

    CommunicationStyleConflict {
        parties: Vec<PartyId>,
        affinity: f64,
    },

    CulturalConsiderationTriggered {
        party_id: PartyId,
        considerations: Vec<String>,
    },
}

impl NegotiationEventPayload {
    /// Versioned routing key.
    pub fn event_type(&self) -> &'static str {
        use NegotiationEventPayload::*;
        match self {
            SessionCreated { .. } => "negotiation.session_created.v1",
            PartyJoined { .. } => "negotiation.party_joined.v1",
            PartyLeft { .. } => "negotiation.party_left.v1",
            ProposalSubmitted { .. } => "negotiation.proposal_submitted.v1",
            ProposalWithdrawn { .. } => "negotiation.proposal_withdrawn.v1",
            ProposalExpired { .. } => "negotiation.proposal_expired.v1",
            CounterProposalSubmitted { .. } => "negotiation.counter_proposal_submitted.v1",
            ResponseReceived { .. } => "negotiation.response_received.v1",
            PhaseAdvanced { .. } => "negotiation.phase_advanced.v1",
            Completed { .. } => "negotiation.completed.v1",
            Terminated { .. } => "negotiation.terminated.v1",
            TimeoutWarning { .. } => "negotiation.timeout_warning.v1",
            ConflictDetected { .. } => "negotiation.conflict_detected.v1",
            DeadlockDetected { .. } => "negotiation.deadlock_detected.v1",
            BreakthroughAchieved { .. } => "negotiation.breakthrough_achieved.v1",
            MetricsUpdated { .. } => "negotiation.metrics_updated.v1",
            PartyCapabilityUpdated { .. } => "negotiation.party_capability_updated.v1",
            CommunicationStyleConflict { .. } => "negotiation.communication_style_conflict.v1",
            CulturalConsiderationTriggered { .. } => "negotiation.cultural_consideration_triggered.v1",
        }
    }
}

impl DomainEvent for NegotiationEvent {
    fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn aggregate_id(&self) -> String {
        self.session_id.to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "NegotiationSession"
    }

    fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    fn event_id(&self) -> EventId {
        self.event_id.clone()
    }
}
