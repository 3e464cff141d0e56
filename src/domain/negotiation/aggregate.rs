//! NegotiationSession aggregate - the root entity for a negotiation.
//!
//! A session owns its parties, proposals and responses, runs the phase state
//! machine and buffers domain events until the caller commits them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::analysis::{Conflict, ConflictType, MomentumAnalysis, MomentumDirection, Trajectory};
use crate::domain::foundation::{
    ActorId, DomainError, ErrorCode, PartyId, ProposalId, SessionId, StateMachine, Timestamp,
};

use super::{
    Capability, NegotiationEvent, NegotiationEventPayload, NegotiationOutcome, NegotiationPhase,
    NegotiationStatus, Party, PartyRole, PhaseChange, ProposalResponse, ProposalTerms,
    ProposalType, SessionConfiguration, SessionMetadata, TerminationReason,
};

/// Lifecycle of a submitted proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Active,
    Withdrawn,
    Expired,
}

/// A proposal as submitted to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub proposal: ProposalTerms,
    pub submitted_by: PartyId,
    pub submitted_at: Timestamp,
    pub status: ProposalStatus,
}

/// Decision-maker responses to one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementTally {
    pub decision_makers: usize,
    pub responded: usize,
    pub accepts: usize,
}

impl AgreementTally {
    /// Unanimous mode needs every decision-maker; otherwise at least half,
    /// and never zero.
    ///
    /// "At least half" is inclusive: with an even number of decision-makers
    /// a tie is sufficient, so 2 accepts out of 4 settle as a partial
    /// agreement once everyone has responded.
    pub fn is_sufficient(&self, require_unanimous: bool) -> bool {
        if self.decision_makers == 0 || self.accepts == 0 {
            return false;
        }
        if require_unanimous {
            self.accepts == self.decision_makers
        } else {
            2 * self.accepts >= self.decision_makers
        }
    }

    pub fn is_unanimous(&self) -> bool {
        self.decision_makers > 0 && self.accepts == self.decision_makers
    }

    pub fn all_responded(&self) -> bool {
        self.decision_makers > 0 && self.responded >= self.decision_makers
    }
}

/// Result of a timeout poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TimeoutCheck {
    /// Session already terminated; nothing to do.
    Inactive,
    OnTrack,
    WarningIssued { hours_remaining: f64 },
    TimedOut,
}

/// The NegotiationSession aggregate root.
///
/// Mutated only through its own operations. Every successful mutation bumps
/// `version` by one and appends to the pending event buffer; the buffer is
/// cleared by [`mark_committed`](Self::mark_committed) once the caller has
/// persisted the session.
#[derive(Debug, Clone)]
pub struct NegotiationSession {
    id: SessionId,
    metadata: SessionMetadata,
    configuration: SessionConfiguration,
    created_by: ActorId,
    created_at: Timestamp,
    parties: BTreeMap<PartyId, Party>,
    active_proposals: BTreeMap<ProposalId, ProposalRecord>,
    proposal_history: Vec<ProposalRecord>,
    responses: BTreeMap<PartyId, Vec<ProposalResponse>>,
    status: NegotiationStatus,
    phase_history: Vec<PhaseChange>,
    latest_metrics: Option<MomentumAnalysis>,
    timeout_warning_issued: bool,
    version: u64,
    pending_events: Vec<NegotiationEvent>,
}

impl NegotiationSession {
    /// Creates a new session in `Initiation`.
    ///
    /// The expected completion time is `at + timeout_hours`.
    pub fn create(
        id: SessionId,
        metadata: SessionMetadata,
        configuration: SessionConfiguration,
        created_by: ActorId,
        at: Timestamp,
    ) -> Result<Self, DomainError> {
        configuration.validate()?;
        let status = NegotiationStatus::initial(
            at,
            Some(at.plus_hours(i64::from(configuration.timeout_hours))),
        )?;

        let mut session = Self {
            id,
            metadata,
            configuration,
            created_by,
            created_at: at,
            parties: BTreeMap::new(),
            active_proposals: BTreeMap::new(),
            proposal_history: Vec::new(),
            responses: BTreeMap::new(),
            status,
            phase_history: Vec::new(),
            latest_metrics: None,
            timeout_warning_issued: false,
            version: 0,
            pending_events: Vec::new(),
        };

        session.record_event(
            at,
            NegotiationEventPayload::SessionCreated {
                title: session.metadata.title.clone(),
                domain: session.metadata.domain.clone(),
                negotiation_type: session.metadata.negotiation_type,
                created_by: session.created_by.clone(),
                configuration,
            },
        );
        session.version = 1;
        Ok(session)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn configuration(&self) -> &SessionConfiguration {
        &self.configuration
    }

    pub fn created_by(&self) -> &ActorId {
        &self.created_by
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn parties(&self) -> impl Iterator<Item = &Party> {
        self.parties.values()
    }

    pub fn party(&self, id: &PartyId) -> Option<&Party> {
        self.parties.get(id)
    }

    pub fn party_count(&self) -> usize {
        self.parties.len()
    }

    pub fn has_party(&self, id: &PartyId) -> bool {
        self.parties.contains_key(id)
    }

    pub fn active_proposals(&self) -> impl Iterator<Item = &ProposalRecord> {
        self.active_proposals.values()
    }

    pub fn active_proposal(&self, id: &ProposalId) -> Option<&ProposalRecord> {
        self.active_proposals.get(id)
    }

    pub fn active_proposal_count(&self) -> usize {
        self.active_proposals.len()
    }

    pub fn proposal_history(&self) -> &[ProposalRecord] {
        &self.proposal_history
    }

    pub fn responses_by(&self, party: &PartyId) -> &[ProposalResponse] {
        self.responses.get(party).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn responses_to(&self, proposal: &ProposalId) -> Vec<&ProposalResponse> {
        self.responses
            .values()
            .flatten()
            .filter(|r| &r.proposal_id() == proposal)
            .collect()
    }

    /// All responses in chronological order.
    pub fn all_responses(&self) -> Vec<&ProposalResponse> {
        let mut all: Vec<&ProposalResponse> = self.responses.values().flatten().collect();
        all.sort_by_key(|r| r.timestamp());
        all
    }

    pub fn has_responded(&self, party: &PartyId, proposal: &ProposalId) -> bool {
        self.responses_by(party)
            .iter()
            .any(|r| &r.proposal_id() == proposal)
    }

    pub fn status(&self) -> &NegotiationStatus {
        &self.status
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.status.phase()
    }

    pub fn outcome(&self) -> NegotiationOutcome {
        self.status.outcome()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn phase_history(&self) -> &[PhaseChange] {
        &self.phase_history
    }

    pub fn latest_metrics(&self) -> Option<&MomentumAnalysis> {
        self.latest_metrics.as_ref()
    }

    pub fn timeout_warning_issued(&self) -> bool {
        self.timeout_warning_issued
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outbox
    // ─────────────────────────────────────────────────────────────────────────

    pub fn pending_events(&self) -> &[NegotiationEvent] {
        &self.pending_events
    }

    /// Copies the pending events for publishing. The buffer is left intact
    /// until [`mark_committed`](Self::mark_committed).
    pub fn drain_events(&self) -> Vec<NegotiationEvent> {
        self.pending_events.clone()
    }

    /// Clears the pending events after a successful commit.
    pub fn mark_committed(&mut self) {
        self.pending_events.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn decision_makers(&self) -> Vec<&Party> {
        self.parties.values().filter(|p| p.is_decision_maker()).collect()
    }

    pub fn mediator(&self) -> Option<&Party> {
        self.parties.values().find(|p| p.role() == PartyRole::Mediator)
    }

    /// Counts decision-maker responses and complete acceptances for a proposal.
    pub fn tally(&self, proposal: &ProposalId) -> AgreementTally {
        let mut tally = AgreementTally {
            decision_makers: 0,
            responded: 0,
            accepts: 0,
        };
        for party in self.parties.values().filter(|p| p.is_decision_maker()) {
            tally.decision_makers += 1;
            if let Some(response) = self
                .responses_by(&party.id())
                .iter()
                .find(|r| &r.proposal_id() == proposal)
            {
                tally.responded += 1;
                if response.is_complete_acceptance() {
                    tally.accepts += 1;
                }
            }
        }
        tally
    }

    /// True when any active proposal has reached the configured quorum.
    pub fn sufficient_agreement(&self) -> bool {
        self.active_proposals
            .keys()
            .any(|id| self.tally(id).is_sufficient(self.configuration.require_unanimous))
    }

    /// Phase-specific readiness predicate checked by unforced advances.
    pub fn is_ready_for(&self, phase: NegotiationPhase) -> bool {
        match phase {
            NegotiationPhase::Initiation
            | NegotiationPhase::Preparation
            | NegotiationPhase::Terminated => true,
            NegotiationPhase::Opening => self.parties.len() >= 2,
            NegotiationPhase::Bargaining => !self.active_proposals.is_empty(),
            NegotiationPhase::Closing => self.active_proposals.keys().any(|id| {
                let tally = self.tally(id);
                tally.decision_makers > 0 && 2 * tally.responded >= tally.decision_makers
            }),
            NegotiationPhase::Implementation => self.sufficient_agreement(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parties
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a party to the session.
    ///
    /// # Errors
    ///
    /// - `SessionInactive` once terminated
    /// - `DuplicateParty` if the id is already present
    /// - `CapacityExceeded` at `max_parties`
    /// - `MediatorConflict` for a second mediator
    /// - `IncompatibleParty` if any existing party is incompatible
    pub fn add_party(&mut self, party: Party, at: Timestamp) -> Result<(), DomainError> {
        self.ensure_active()?;
        if self.parties.contains_key(&party.id()) {
            return Err(DomainError::new(
                ErrorCode::DuplicateParty,
                format!("Party {} already in session", party.id()),
            ));
        }
        if self.parties.len() >= self.configuration.max_parties {
            return Err(DomainError::new(
                ErrorCode::CapacityExceeded,
                format!("Session is full ({} parties)", self.configuration.max_parties),
            ));
        }
        if party.role() == PartyRole::Mediator && self.mediator().is_some() {
            return Err(DomainError::new(
                ErrorCode::MediatorConflict,
                "Session already has a mediator",
            ));
        }
        for existing in self.parties.values() {
            if let Some(reason) = party.incompatibility_with(existing) {
                return Err(DomainError::new(
                    ErrorCode::IncompatibleParty,
                    format!("Party {} is incompatible with {}: {}", party.id(), existing.id(), reason),
                )
                .with_detail("conflicting_party", existing.id().to_string()));
            }
        }

        let style_conflicts: Vec<(PartyId, f64)> = self
            .parties
            .values()
            .map(|existing| {
                let affinity = party
                    .preferences()
                    .communication_style
                    .affinity(existing.preferences().communication_style);
                (existing.id(), affinity)
            })
            .filter(|(_, affinity)| *affinity < 0.0)
            .collect();

        let party_id = party.id();
        let considerations: Vec<String> = party
            .preferences()
            .cultural_considerations
            .iter()
            .cloned()
            .collect();

        self.record_event(
            at,
            NegotiationEventPayload::PartyJoined {
                party_id,
                entity_id: party.entity_id().clone(),
                role: party.role(),
                authority: party.authority(),
            },
        );
        for (other, affinity) in style_conflicts {
            self.record_event(
                at,
                NegotiationEventPayload::CommunicationStyleConflict {
                    parties: vec![party_id, other],
                    affinity,
                },
            );
        }
        if !considerations.is_empty() {
            self.record_event(
                at,
                NegotiationEventPayload::CulturalConsiderationTriggered {
                    party_id,
                    considerations,
                },
            );
        }

        self.parties.insert(party_id, party);
        self.status = self.status.touched(at);

        if self.configuration.auto_advance
            && self.phase() == NegotiationPhase::Initiation
            && self.parties.len() >= 2
        {
            self.apply_phase_change(NegotiationPhase::Preparation, false, at)?;
        }

        self.version += 1;
        Ok(())
    }

    /// Removes a party.
    ///
    /// # Errors
    ///
    /// - `InsufficientParties` if fewer than two would remain
    /// - `MediatorConflict` when removing the mediator while non-decision
    ///   parties remain
    pub fn remove_party(
        &mut self,
        party_id: &PartyId,
        reason: Option<String>,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        let party = self.require_party(party_id)?;
        if self.parties.len() < 3 {
            return Err(DomainError::new(
                ErrorCode::InsufficientParties,
                "A session needs at least two parties",
            ));
        }
        if party.role() == PartyRole::Mediator
            && self
                .parties
                .values()
                .any(|p| &p.id() != party_id && !p.is_decision_maker())
        {
            return Err(DomainError::new(
                ErrorCode::MediatorConflict,
                "Cannot remove the mediator while non-decision-making parties remain",
            ));
        }

        self.parties.remove(party_id);
        self.record_event(
            at,
            NegotiationEventPayload::PartyLeft {
                party_id: *party_id,
                reason,
            },
        );
        self.status = self.status.touched(at);
        self.version += 1;
        Ok(())
    }

    /// Replaces a party's capabilities.
    pub fn update_party_capabilities(
        &mut self,
        party_id: &PartyId,
        capabilities: Vec<Capability>,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        let updated = self
            .require_party(party_id)?
            .clone()
            .with_capabilities(capabilities)?;
        let names = updated.capabilities().iter().map(|c| c.name.clone()).collect();
        self.parties.insert(*party_id, updated);
        self.record_event(
            at,
            NegotiationEventPayload::PartyCapabilityUpdated {
                party_id: *party_id,
                capabilities: names,
            },
        );
        self.status = self.status.touched(at);
        self.version += 1;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Proposals
    // ─────────────────────────────────────────────────────────────────────────

    /// Submits a proposal on behalf of a party.
    ///
    /// In `Preparation` with auto-advance on, the session first moves to
    /// `Opening` (when ready). A counter proposal referencing an earlier one
    /// also emits `CounterProposalSubmitted`.
    pub fn submit_proposal(
        &mut self,
        proposal: ProposalTerms,
        submitter: &PartyId,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        let party = self.require_party(submitter)?;
        if !party.can_make_binding_decisions() {
            return Err(DomainError::new(
                ErrorCode::NotAuthorized,
                format!("Party {} lacks binding authority", submitter),
            ));
        }

        let auto_open = self.configuration.auto_advance
            && self.phase() == NegotiationPhase::Preparation
            && self.is_ready_for(NegotiationPhase::Opening);
        let effective_phase = if auto_open {
            NegotiationPhase::Opening
        } else {
            self.phase()
        };
        if !effective_phase.accepts_proposals() {
            return Err(DomainError::new(
                ErrorCode::WrongPhase,
                format!("Proposals are not accepted in {}", effective_phase),
            ));
        }
        if proposal.is_expired(at) {
            return Err(DomainError::new(
                ErrorCode::ProposalExpired,
                format!("Proposal {} is past its validity period", proposal.id()),
            ));
        }
        if self.proposal_history.iter().any(|r| r.proposal.id() == proposal.id()) {
            return Err(DomainError::validation(
                "proposal_id",
                format!("Proposal {} was already submitted", proposal.id()),
            ));
        }
        let counter_to = match (proposal.proposal_type(), proposal.counter_to()) {
            (ProposalType::Counter, Some(original)) => {
                if !self.proposal_history.iter().any(|r| r.proposal.id() == original) {
                    return Err(DomainError::not_found(ErrorCode::ProposalNotFound, "Proposal", original));
                }
                Some(original)
            }
            _ => None,
        };

        if auto_open {
            self.apply_phase_change(NegotiationPhase::Opening, false, at)?;
        }

        let proposal_id = proposal.id();
        self.record_event(
            at,
            NegotiationEventPayload::ProposalSubmitted {
                proposal_id,
                submitted_by: *submitter,
                proposal_type: proposal.proposal_type(),
                term_count: proposal.terms().len(),
            },
        );
        if let Some(original) = counter_to {
            self.record_event(
                at,
                NegotiationEventPayload::CounterProposalSubmitted {
                    proposal_id,
                    counter_to: original,
                    submitted_by: *submitter,
                },
            );
        }

        let record = ProposalRecord {
            proposal,
            submitted_by: *submitter,
            submitted_at: at,
            status: ProposalStatus::Active,
        };
        self.proposal_history.push(record.clone());
        self.active_proposals.insert(proposal_id, record);
        self.status = self.status.touched(at);
        self.version += 1;
        Ok(())
    }

    /// Withdraws an active proposal. Only its submitter or the mediator may.
    pub fn withdraw_proposal(
        &mut self,
        proposal_id: &ProposalId,
        by: &PartyId,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        let actor = self.require_party(by)?;
        let record = self
            .active_proposals
            .get(proposal_id)
            .ok_or_else(|| DomainError::not_found(ErrorCode::ProposalNotFound, "Proposal", proposal_id))?;
        if &record.submitted_by != by && actor.role() != PartyRole::Mediator {
            return Err(DomainError::new(
                ErrorCode::NotAuthorized,
                format!("Party {} cannot withdraw proposal {}", by, proposal_id),
            ));
        }

        self.retire_proposal(proposal_id, ProposalStatus::Withdrawn);
        self.record_event(
            at,
            NegotiationEventPayload::ProposalWithdrawn {
                proposal_id: *proposal_id,
                withdrawn_by: *by,
            },
        );
        self.status = self.status.touched(at);
        self.version += 1;
        Ok(())
    }

    /// Moves every active proposal past its validity into `Expired`.
    ///
    /// Returns the expired ids; a no-op on terminated sessions.
    pub fn expire_proposals(&mut self, now: Timestamp) -> Vec<ProposalId> {
        if !self.is_active() {
            return Vec::new();
        }
        let expired: Vec<ProposalId> = self
            .active_proposals
            .values()
            .filter(|r| r.proposal.is_expired(now))
            .map(|r| r.proposal.id())
            .collect();
        for id in &expired {
            self.retire_proposal(id, ProposalStatus::Expired);
            self.record_event(now, NegotiationEventPayload::ProposalExpired { proposal_id: *id });
        }
        if !expired.is_empty() {
            self.version += 1;
        }
        expired
    }

    fn retire_proposal(&mut self, proposal_id: &ProposalId, status: ProposalStatus) {
        self.active_proposals.remove(proposal_id);
        if let Some(entry) = self
            .proposal_history
            .iter_mut()
            .rev()
            .find(|r| &r.proposal.id() == proposal_id)
        {
            entry.status = status;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Responses
    // ─────────────────────────────────────────────────────────────────────────

    /// Records a response, then evaluates auto-completion.
    ///
    /// Auto-completion runs once every decision-maker has answered the
    /// proposal. Falling short of the quorum leaves the session open.
    pub fn submit_response(&mut self, response: ProposalResponse, at: Timestamp) -> Result<(), DomainError> {
        self.ensure_active()?;
        let responder = response.responder();
        let proposal_id = response.proposal_id();
        let party = self.require_party(&responder)?;
        let record = self
            .active_proposals
            .get(&proposal_id)
            .ok_or_else(|| DomainError::not_found(ErrorCode::ProposalNotFound, "Proposal", proposal_id))?;
        if !party.can_make_binding_decisions() {
            return Err(DomainError::new(
                ErrorCode::NotAuthorized,
                format!("Party {} lacks binding authority", responder),
            ));
        }
        if record.proposal.is_expired(at) {
            return Err(DomainError::new(
                ErrorCode::ProposalExpired,
                format!("Proposal {} is past its validity period", proposal_id),
            ));
        }
        if let Some(unknown) = response
            .term_responses()
            .iter()
            .find(|tr| !record.proposal.has_term(&tr.term_id))
        {
            return Err(DomainError::validation(
                "term_responses",
                format!("Term {} is not part of proposal {}", unknown.term_id, proposal_id),
            ));
        }
        if self.has_responded(&responder, &proposal_id) {
            return Err(DomainError::new(
                ErrorCode::DuplicateResponse,
                format!("Party {} already responded to proposal {}", responder, proposal_id),
            ));
        }

        self.record_event(
            at,
            NegotiationEventPayload::ResponseReceived {
                response_id: response.id(),
                proposal_id,
                responder,
                response: response.response(),
            },
        );
        self.responses.entry(responder).or_default().push(response);
        self.status = self.status.touched(at);
        self.version += 1;

        if self.configuration.auto_advance {
            let tally = self.tally(&proposal_id);
            if tally.all_responded() {
                match self.try_auto_complete(tally, at) {
                    Ok(()) => {}
                    Err(err) if err.code == ErrorCode::InsufficientAgreement => {
                        debug!(
                            session_id = %self.id,
                            proposal_id = %proposal_id,
                            accepts = tally.accepts,
                            decision_makers = tally.decision_makers,
                            "auto-completion skipped: {}",
                            err.message
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    fn try_auto_complete(&mut self, tally: AgreementTally, at: Timestamp) -> Result<(), DomainError> {
        if !tally.is_sufficient(self.configuration.require_unanimous) {
            return Err(DomainError::new(
                ErrorCode::InsufficientAgreement,
                format!("{} of {} decision-makers accepted", tally.accepts, tally.decision_makers),
            ));
        }
        let outcome = if tally.is_unanimous() {
            NegotiationOutcome::AgreementReached
        } else if self.configuration.allow_partial_agreement {
            NegotiationOutcome::PartialAgreement
        } else {
            return Err(DomainError::new(
                ErrorCode::InsufficientAgreement,
                "Partial agreement is disabled for this session",
            ));
        };
        self.terminate_internal(outcome, TerminationReason::MutualAgreement, None, at)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Phase state machine
    // ─────────────────────────────────────────────────────────────────────────

    /// Moves to `target`.
    ///
    /// The move must be one step forward or a jump to `Terminated`. Unforced
    /// moves also require [`is_ready_for`](Self::is_ready_for). Advancing to
    /// `Terminated` cancels the session.
    pub fn advance_phase(
        &mut self,
        target: NegotiationPhase,
        forced: bool,
        by: Option<ActorId>,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.phase().transition_to(target)?;

        if target == NegotiationPhase::Terminated {
            self.terminate_internal(
                NegotiationOutcome::Cancelled,
                TerminationReason::ManualTermination,
                by,
                at,
            )?;
        } else {
            if !forced && !self.is_ready_for(target) {
                return Err(DomainError::new(
                    ErrorCode::PhaseNotReady,
                    format!("Session is not ready for {}", target),
                )
                .with_detail("target", target.to_string()));
            }
            self.apply_phase_change(target, forced, at)?;
        }
        self.version += 1;
        Ok(())
    }

    /// Ends the negotiation.
    ///
    /// Positive outcomes require sufficient agreement; a session still
    /// short of `Closing` is stepped forward to it first.
    pub fn terminate(
        &mut self,
        outcome: NegotiationOutcome,
        reason: TerminationReason,
        by: Option<ActorId>,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.terminate_internal(outcome, reason, by, at)?;
        self.version += 1;
        Ok(())
    }

    /// Polls the deadline.
    ///
    /// Inside the warning window a single `TimeoutWarning` is emitted; at or
    /// past `expected_completion_at` the session terminates with `Timeout`.
    pub fn check_timeout(&mut self, now: Timestamp) -> Result<TimeoutCheck, DomainError> {
        if !self.is_active() {
            return Ok(TimeoutCheck::Inactive);
        }
        let Some(expected) = self.status.expected_completion_at() else {
            return Ok(TimeoutCheck::OnTrack);
        };

        if !now.is_before(&expected) {
            self.terminate_internal(
                NegotiationOutcome::Timeout,
                TerminationReason::TimeoutExceeded,
                None,
                now,
            )?;
            self.version += 1;
            return Ok(TimeoutCheck::TimedOut);
        }

        let hours_remaining = expected.hours_since(&now);
        if !self.timeout_warning_issued
            && hours_remaining <= f64::from(self.configuration.timeout_warning_hours)
        {
            self.timeout_warning_issued = true;
            self.record_event(
                now,
                NegotiationEventPayload::TimeoutWarning {
                    expected_completion_at: expected,
                    hours_remaining,
                },
            );
            self.version += 1;
            return Ok(TimeoutCheck::WarningIssued { hours_remaining });
        }
        Ok(TimeoutCheck::OnTrack)
    }

    fn terminate_internal(
        &mut self,
        outcome: NegotiationOutcome,
        reason: TerminationReason,
        by: Option<ActorId>,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if outcome.is_pending() {
            return Err(DomainError::validation("outcome", "Cannot terminate with a pending outcome"));
        }

        if outcome.is_positive() {
            if !self.sufficient_agreement() {
                return Err(DomainError::new(
                    ErrorCode::InsufficientAgreement,
                    format!("Outcome {} requires sufficient agreement", outcome),
                ));
            }
            if outcome == NegotiationOutcome::PartialAgreement && !self.configuration.allow_partial_agreement {
                return Err(DomainError::new(
                    ErrorCode::InsufficientAgreement,
                    "Partial agreement is disabled for this session",
                ));
            }
            let steps = self.steps_to_closing();
            if let Some(blocked) = steps.iter().find(|p| !self.is_ready_for(**p)) {
                return Err(DomainError::new(
                    ErrorCode::PhaseNotReady,
                    format!("Session is not ready for {}", blocked),
                ));
            }
            for step in steps {
                self.apply_phase_change(step, false, at)?;
            }
        }

        let from = self.phase();
        self.status = self.status.complete_with_outcome(outcome, reason, at)?;
        let completed_at = self.status.last_activity_at();
        self.phase_history.push(PhaseChange {
            from,
            to: NegotiationPhase::Terminated,
            at: completed_at,
            forced: false,
        });

        let payload = if outcome.is_positive() {
            NegotiationEventPayload::Completed {
                outcome,
                reason,
                completed_by: by,
            }
        } else {
            NegotiationEventPayload::Terminated {
                outcome,
                reason,
                terminated_by: by,
            }
        };
        self.record_event(completed_at, payload);
        Ok(())
    }

    /// Phases between the current one (exclusive) and `Closing` (inclusive).
    fn steps_to_closing(&self) -> Vec<NegotiationPhase> {
        let mut steps = Vec::new();
        let mut current = self.phase();
        while current < NegotiationPhase::Closing {
            match current.next() {
                Some(next) => {
                    steps.push(next);
                    current = next;
                }
                None => break,
            }
        }
        steps
    }

    fn apply_phase_change(&mut self, to: NegotiationPhase, forced: bool, at: Timestamp) -> Result<(), DomainError> {
        let from = self.phase();
        self.status = self.status.with_phase(to, at)?;
        self.phase_history.push(PhaseChange { from, to, at, forced });
        self.record_event(at, NegotiationEventPayload::PhaseAdvanced { from, to, forced });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Analysis results
    // ─────────────────────────────────────────────────────────────────────────

    /// Records detected conflicts as events.
    pub fn record_conflicts(&mut self, conflicts: &[Conflict], at: Timestamp) -> Result<(), DomainError> {
        self.ensure_active()?;
        if conflicts.is_empty() {
            return Ok(());
        }
        for conflict in conflicts {
            self.record_event(
                at,
                NegotiationEventPayload::ConflictDetected {
                    conflict_type: conflict.conflict_type,
                    severity: conflict.severity,
                    parties: conflict.parties.clone(),
                    description: conflict.description.clone(),
                },
            );
            match conflict.conflict_type {
                ConflictType::StyleIncompatibility => {
                    let affinity = match conflict.parties.as_slice() {
                        [a, b] => match (self.parties.get(a), self.parties.get(b)) {
                            (Some(a), Some(b)) => a
                                .preferences()
                                .communication_style
                                .affinity(b.preferences().communication_style),
                            _ => 0.0,
                        },
                        _ => 0.0,
                    };
                    self.record_event(
                        at,
                        NegotiationEventPayload::CommunicationStyleConflict {
                            parties: conflict.parties.clone(),
                            affinity,
                        },
                    );
                }
                ConflictType::CulturalMismatch => {
                    let triggered: Vec<(PartyId, Vec<String>)> = conflict
                        .parties
                        .iter()
                        .filter_map(|id| self.parties.get(id))
                        .map(|p| {
                            (
                                p.id(),
                                p.preferences().cultural_considerations.iter().cloned().collect(),
                            )
                        })
                        .collect();
                    for (party_id, considerations) in triggered {
                        self.record_event(
                            at,
                            NegotiationEventPayload::CulturalConsiderationTriggered {
                                party_id,
                                considerations,
                            },
                        );
                    }
                }
                _ => {}
            }
        }
        self.version += 1;
        Ok(())
    }

    /// Stores a momentum snapshot.
    ///
    /// Emits `DeadlockDetected` for a deadlocked trajectory and
    /// `BreakthroughAchieved` when direction turns positive with a score of
    /// at least 70 after a non-positive snapshot.
    pub fn record_metrics(&mut self, momentum: MomentumAnalysis, at: Timestamp) -> Result<(), DomainError> {
        self.ensure_active()?;
        let previous = self.latest_metrics.as_ref().map(|m| m.direction);
        let score = momentum.score.value();

        self.record_event(
            at,
            NegotiationEventPayload::MetricsUpdated {
                momentum_score: score,
                direction: momentum.direction,
                trajectory: momentum.trajectory,
            },
        );
        if momentum.trajectory == Trajectory::Deadlocked {
            self.record_event(at, NegotiationEventPayload::DeadlockDetected { momentum_score: score });
        }
        let turned_positive = matches!(previous, Some(d) if d != MomentumDirection::Positive);
        if turned_positive && momentum.direction == MomentumDirection::Positive && score >= 70.0 {
            self.record_event(at, NegotiationEventPayload::BreakthroughAchieved { momentum_score: score });
        }

        self.latest_metrics = Some(momentum);
        self.version += 1;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::SessionInactive,
                format!("Session {} is terminated", self.id),
            ))
        }
    }

    fn require_party(&self, id: &PartyId) -> Result<&Party, DomainError> {
        self.parties
            .get(id)
            .ok_or_else(|| DomainError::not_found(ErrorCode::PartyNotFound, "Party", id))
    }

    fn record_event(&mut self, at: Timestamp, payload: NegotiationEventPayload) {
        self.pending_events.push(NegotiationEvent::new(self.id, at, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::ConflictSeverity;
    use crate::domain::foundation::{EntityId, Score, TermId};
    use crate::domain::negotiation::{
        AuthorityLevel, CommunicationStyle, NegotiationType, PartyPreferences, ResponseType,
        TermCondition, TermResponse,
    };

    fn t0() -> Timestamp {
        Timestamp::now()
    }

    fn party(role: PartyRole, authority: AuthorityLevel) -> Party {
        Party::new(
            PartyId::new(),
            EntityId::new("entity").unwrap(),
            "Party",
            role,
            authority,
        )
        .unwrap()
    }

    fn decision_maker() -> Party {
        party(PartyRole::Initiator, AuthorityLevel::Full)
    }

    fn session_with(config: SessionConfiguration) -> NegotiationSession {
        NegotiationSession::create(
            SessionId::new(),
            SessionMetadata::new("Supply", NegotiationType::Commercial).unwrap(),
            config,
            ActorId::new("creator").unwrap(),
            t0(),
        )
        .unwrap()
    }

    fn proposal() -> ProposalTerms {
        ProposalTerms::new(
            ProposalId::new(),
            ProposalType::Initial,
            "Offer",
            "First offer",
            vec![
                TermCondition::new(TermId::new("price").unwrap(), "price", "Unit price").unwrap(),
                TermCondition::new(TermId::new("delivery").unwrap(), "logistics", "Delivery").unwrap(),
            ],
            None,
            t0(),
        )
        .unwrap()
    }

    fn accept(proposal: ProposalId, party: PartyId) -> ProposalResponse {
        ProposalResponse::builder(proposal, party, ResponseType::Accept, t0())
            .build()
            .unwrap()
    }

    fn reject(proposal: ProposalId, party: PartyId) -> ProposalResponse {
        ProposalResponse::builder(proposal, party, ResponseType::Reject, t0())
            .reason("price too high")
            .build()
            .unwrap()
    }

    /// Session with two decision-makers and one active proposal.
    fn negotiating(config: SessionConfiguration) -> (NegotiationSession, PartyId, PartyId, ProposalId) {
        let mut s = session_with(config);
        let a = decision_maker();
        let b = party(PartyRole::Respondent, AuthorityLevel::Executive);
        let (a_id, b_id) = (a.id(), b.id());
        s.add_party(a, t0()).unwrap();
        s.add_party(b, t0()).unwrap();
        if s.phase() == NegotiationPhase::Initiation {
            s.advance_phase(NegotiationPhase::Preparation, false, None, t0()).unwrap();
        }
        if s.phase() == NegotiationPhase::Preparation && !config.auto_advance {
            s.advance_phase(NegotiationPhase::Opening, false, None, t0()).unwrap();
        }
        let p = proposal();
        let p_id = p.id();
        s.submit_proposal(p, &a_id, t0()).unwrap();
        (s, a_id, b_id, p_id)
    }

    // ───────────────────────────────────────────────────────────────
    // Creation
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn new_session_starts_in_initiation() {
        let s = session_with(SessionConfiguration::default());
        assert_eq!(s.phase(), NegotiationPhase::Initiation);
        assert_eq!(s.outcome(), NegotiationOutcome::Pending);
        assert_eq!(s.version(), 1);
        assert_eq!(s.pending_events().len(), 1);
        assert_eq!(s.pending_events()[0].payload.event_type(), "negotiation.session_created.v1");
    }

    #[test]
    fn expected_completion_follows_timeout() {
        let s = session_with(SessionConfiguration::default().with_timeout_hours(10));
        let expected = s.status().expected_completion_at().unwrap();
        assert_eq!(expected, s.created_at().plus_hours(10));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let result = NegotiationSession::create(
            SessionId::new(),
            SessionMetadata::new("x", NegotiationType::Other).unwrap(),
            SessionConfiguration::default().with_max_parties(1),
            ActorId::new("creator").unwrap(),
            t0(),
        );
        assert_eq!(result.unwrap_err().code, ErrorCode::ValidationFailed);
    }

    // ───────────────────────────────────────────────────────────────
    // Parties
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn add_party_records_event_and_bumps_version() {
        let mut s = session_with(SessionConfiguration::default().with_auto_advance(false));
        s.add_party(decision_maker(), t0()).unwrap();
        assert_eq!(s.party_count(), 1);
        assert_eq!(s.version(), 2);
        assert!(s
            .pending_events()
            .iter()
            .any(|e| matches!(e.payload, NegotiationEventPayload::PartyJoined { .. })));
    }

    #[test]
    fn duplicate_party_is_rejected() {
        let mut s = session_with(SessionConfiguration::default());
        let p = decision_maker();
        s.add_party(p.clone(), t0()).unwrap();
        assert_eq!(s.add_party(p, t0()).unwrap_err().code, ErrorCode::DuplicateParty);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut s = session_with(SessionConfiguration::default().with_max_parties(2));
        s.add_party(decision_maker(), t0()).unwrap();
        s.add_party(decision_maker(), t0()).unwrap();
        let err = s.add_party(decision_maker(), t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::CapacityExceeded);
        assert_eq!(s.party_count(), 2);
    }

    #[test]
    fn second_mediator_is_rejected() {
        let mut s = session_with(SessionConfiguration::default());
        s.add_party(party(PartyRole::Mediator, AuthorityLevel::Limited), t0()).unwrap();
        let err = s
            .add_party(party(PartyRole::Mediator, AuthorityLevel::Limited), t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MediatorConflict);
    }

    #[test]
    fn incompatible_party_is_rejected() {
        let mut s = session_with(SessionConfiguration::default());
        s.add_party(decision_maker(), t0()).unwrap();
        let french = decision_maker()
            .with_preferences(PartyPreferences {
                primary_language: "fr".to_string(),
                ..PartyPreferences::default()
            })
            .unwrap();
        let err = s.add_party(french, t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::IncompatibleParty);
        assert_eq!(s.version(), 2);
    }

    #[test]
    fn tolerable_style_clash_emits_style_conflict_event() {
        let mut s = session_with(SessionConfiguration::default());
        let formal = decision_maker()
            .with_preferences(PartyPreferences {
                communication_style: CommunicationStyle::Formal,
                ..PartyPreferences::default()
            })
            .unwrap();
        let informal = decision_maker()
            .with_preferences(PartyPreferences {
                communication_style: CommunicationStyle::Informal,
                cultural_considerations: ["punctuality".to_string()].into_iter().collect(),
                ..PartyPreferences::default()
            })
            .unwrap();
        s.add_party(formal, t0()).unwrap();
        s.add_party(informal, t0()).unwrap();
        let types: Vec<&str> = s.pending_events().iter().map(|e| e.payload.event_type()).collect();
        assert!(types.contains(&"negotiation.communication_style_conflict.v1"));
        assert!(types.contains(&"negotiation.cultural_consideration_triggered.v1"));
    }

    #[test]
    fn two_parties_auto_advance_to_preparation() {
        let mut s = session_with(SessionConfiguration::default());
        s.add_party(decision_maker(), t0()).unwrap();
        assert_eq!(s.phase(), NegotiationPhase::Initiation);
        s.add_party(decision_maker(), t0()).unwrap();
        assert_eq!(s.phase(), NegotiationPhase::Preparation);
        assert_eq!(s.phase_history().len(), 1);
    }

    #[test]
    fn remove_party_requires_two_remaining() {
        let mut s = session_with(SessionConfiguration::default());
        let a = decision_maker();
        let a_id = a.id();
        s.add_party(a, t0()).unwrap();
        s.add_party(decision_maker(), t0()).unwrap();
        let err = s.remove_party(&a_id, None, t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientParties);

        s.add_party(decision_maker(), t0()).unwrap();
        s.remove_party(&a_id, Some("left".into()), t0()).unwrap();
        assert_eq!(s.party_count(), 2);
    }

    #[test]
    fn mediator_stays_while_advisors_remain() {
        let mut s = session_with(SessionConfiguration::default());
        let mediator = party(PartyRole::Mediator, AuthorityLevel::Limited);
        let m_id = mediator.id();
        s.add_party(decision_maker(), t0()).unwrap();
        s.add_party(decision_maker(), t0()).unwrap();
        s.add_party(mediator, t0()).unwrap();
        s.add_party(party(PartyRole::Advisor, AuthorityLevel::Advisory), t0()).unwrap();
        let err = s.remove_party(&m_id, None, t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MediatorConflict);
    }

    #[test]
    fn remove_unknown_party_is_not_found() {
        let mut s = session_with(SessionConfiguration::default());
        let err = s.remove_party(&PartyId::new(), None, t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::PartyNotFound);
    }

    // ───────────────────────────────────────────────────────────────
    // Proposals
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn submit_proposal_auto_opens_from_preparation() {
        let (s, _, _, p_id) = negotiating(SessionConfiguration::default());
        assert_eq!(s.phase(), NegotiationPhase::Opening);
        assert!(s.active_proposal(&p_id).is_some());
        assert_eq!(s.proposal_history().len(), 1);
    }

    #[test]
    fn submit_proposal_in_initiation_is_wrong_phase() {
        let mut s = session_with(SessionConfiguration::default().with_auto_advance(false));
        let a = decision_maker();
        let a_id = a.id();
        s.add_party(a, t0()).unwrap();
        let err = s.submit_proposal(proposal(), &a_id, t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::WrongPhase);
    }

    #[test]
    fn submit_proposal_requires_binding_authority() {
        let (mut s, _, _, _) = negotiating(SessionConfiguration::default());
        let advisor = party(PartyRole::Advisor, AuthorityLevel::Advisory);
        let adv_id = advisor.id();
        s.add_party(advisor, t0()).unwrap();
        let err = s.submit_proposal(proposal(), &adv_id, t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthorized);
    }

    #[test]
    fn expired_proposal_is_rejected() {
        let (mut s, a_id, _, _) = negotiating(SessionConfiguration::default());
        let created = t0();
        let p = ProposalTerms::new(
            ProposalId::new(),
            ProposalType::Revised,
            "Late",
            "",
            vec![TermCondition::new(TermId::new("x").unwrap(), "price", "x").unwrap()],
            Some(created.plus_hours(1)),
            created,
        )
        .unwrap();
        let err = s.submit_proposal(p, &a_id, created.plus_hours(2)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProposalExpired);
    }

    #[test]
    fn counter_proposal_emits_counter_event() {
        let (mut s, _, b_id, p_id) = negotiating(SessionConfiguration::default());
        let counter = ProposalTerms::new(
            ProposalId::new(),
            ProposalType::Counter,
            "Counter",
            "",
            vec![TermCondition::new(TermId::new("price").unwrap(), "price", "Lower").unwrap()],
            None,
            t0(),
        )
        .unwrap()
        .countering(p_id);
        s.submit_proposal(counter, &b_id, t0()).unwrap();
        assert!(s
            .pending_events()
            .iter()
            .any(|e| matches!(e.payload, NegotiationEventPayload::CounterProposalSubmitted { counter_to, .. } if counter_to == p_id)));
    }

    #[test]
    fn withdraw_is_limited_to_submitter() {
        let (mut s, a_id, b_id, p_id) = negotiating(SessionConfiguration::default());
        let err = s.withdraw_proposal(&p_id, &b_id, t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthorized);
        s.withdraw_proposal(&p_id, &a_id, t0()).unwrap();
        assert_eq!(s.active_proposal_count(), 0);
        assert_eq!(s.proposal_history()[0].status, ProposalStatus::Withdrawn);
    }

    #[test]
    fn expire_proposals_retires_stale_offers() {
        let (mut s, a_id, _, _) = negotiating(SessionConfiguration::default());
        let created = t0();
        let short = ProposalTerms::new(
            ProposalId::new(),
            ProposalType::Revised,
            "Short",
            "",
            vec![TermCondition::new(TermId::new("x").unwrap(), "price", "x").unwrap()],
            Some(created.plus_hours(1)),
            created,
        )
        .unwrap();
        let short_id = short.id();
        s.submit_proposal(short, &a_id, created).unwrap();
        let expired = s.expire_proposals(created.plus_hours(3));
        assert_eq!(expired, vec![short_id]);
        assert_eq!(s.active_proposal_count(), 1);
    }

    // ───────────────────────────────────────────────────────────────
    // Responses and auto-completion
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn duplicate_response_is_rejected() {
        let (mut s, a_id, _, p_id) = negotiating(SessionConfiguration::default());
        s.submit_response(reject(p_id, a_id), t0()).unwrap();
        let err = s.submit_response(reject(p_id, a_id), t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateResponse);
    }

    #[test]
    fn response_to_unknown_proposal_is_not_found() {
        let (mut s, a_id, _, _) = negotiating(SessionConfiguration::default());
        let err = s.submit_response(accept(ProposalId::new(), a_id), t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProposalNotFound);
    }

    #[test]
    fn response_with_foreign_term_is_rejected() {
        let (mut s, a_id, _, p_id) = negotiating(SessionConfiguration::default());
        let response = ProposalResponse::builder(p_id, a_id, ResponseType::Accept, t0())
            .term_response(TermResponse::accept(TermId::new("warranty").unwrap()))
            .build()
            .unwrap();
        assert_eq!(s.submit_response(response, t0()).unwrap_err().code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn all_accept_reaches_agreement() {
        let (mut s, a_id, b_id, p_id) = negotiating(SessionConfiguration::default().with_max_parties(2));
        s.submit_response(accept(p_id, a_id), t0()).unwrap();
        assert!(s.is_active());
        s.submit_response(accept(p_id, b_id), t0()).unwrap();
        assert_eq!(s.phase(), NegotiationPhase::Terminated);
        assert_eq!(s.outcome(), NegotiationOutcome::AgreementReached);
        assert_eq!(s.status().termination_reason(), Some(TerminationReason::MutualAgreement));
    }

    #[test]
    fn half_accept_reaches_partial_agreement() {
        let (mut s, a_id, b_id, p_id) = negotiating(SessionConfiguration::default());
        s.submit_response(accept(p_id, a_id), t0()).unwrap();
        s.submit_response(reject(p_id, b_id), t0()).unwrap();
        assert_eq!(s.outcome(), NegotiationOutcome::PartialAgreement);
    }

    #[test]
    fn tally_treats_an_exact_half_as_sufficient() {
        let tally = |accepts| AgreementTally {
            decision_makers: 4,
            responded: 4,
            accepts,
        };
        assert!(!tally(1).is_sufficient(false));
        assert!(tally(2).is_sufficient(false));
        assert!(!tally(2).is_unanimous());
        assert!(!tally(3).is_sufficient(true));
        assert!(tally(4).is_sufficient(true));
        let odd = AgreementTally {
            decision_makers: 3,
            responded: 3,
            accepts: 1,
        };
        assert!(!odd.is_sufficient(false));
    }

    #[test]
    fn unanimous_mode_keeps_session_open() {
        let (mut s, a_id, b_id, p_id) = negotiating(SessionConfiguration::default().unanimous(true));
        s.submit_response(accept(p_id, a_id), t0()).unwrap();
        s.submit_response(reject(p_id, b_id), t0()).unwrap();
        assert!(s.is_active());
        assert_eq!(s.outcome(), NegotiationOutcome::Pending);
    }

    #[test]
    fn disabled_partial_agreement_keeps_session_open() {
        let (mut s, a_id, b_id, p_id) =
            negotiating(SessionConfiguration::default().with_partial_agreement(false));
        s.submit_response(accept(p_id, a_id), t0()).unwrap();
        s.submit_response(reject(p_id, b_id), t0()).unwrap();
        assert!(s.is_active());
    }

    #[test]
    fn no_auto_completion_without_auto_advance() {
        let (mut s, a_id, b_id, p_id) = negotiating(SessionConfiguration::default().with_auto_advance(false));
        s.submit_response(accept(p_id, a_id), t0()).unwrap();
        s.submit_response(accept(p_id, b_id), t0()).unwrap();
        assert!(s.is_active());
        assert!(s.sufficient_agreement());
    }

    // ───────────────────────────────────────────────────────────────
    // Phase transitions
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn skipping_a_phase_is_invalid() {
        let mut s = session_with(SessionConfiguration::default());
        let err = s
            .advance_phase(NegotiationPhase::Opening, true, None, t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn unforced_advance_checks_readiness() {
        let mut s = session_with(SessionConfiguration::default().with_auto_advance(false));
        s.advance_phase(NegotiationPhase::Preparation, false, None, t0()).unwrap();
        let err = s
            .advance_phase(NegotiationPhase::Opening, false, None, t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PhaseNotReady);
        s.advance_phase(NegotiationPhase::Opening, true, None, t0()).unwrap();
        assert!(s.phase_history().last().unwrap().forced);
    }

    #[test]
    fn advancing_to_terminated_cancels() {
        let mut s = session_with(SessionConfiguration::default());
        s.advance_phase(NegotiationPhase::Terminated, false, Some(ActorId::new("ops").unwrap()), t0())
            .unwrap();
        assert_eq!(s.outcome(), NegotiationOutcome::Cancelled);
        assert_eq!(s.status().termination_reason(), Some(TerminationReason::ManualTermination));
        let err = s
            .advance_phase(NegotiationPhase::Terminated, false, None, t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn positive_termination_needs_agreement() {
        let (mut s, _, _, _) = negotiating(SessionConfiguration::default());
        let err = s
            .terminate(NegotiationOutcome::AgreementReached, TerminationReason::MutualAgreement, None, t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientAgreement);
        assert!(s.is_active());
    }

    #[test]
    fn positive_termination_steps_to_closing() {
        let (mut s, a_id, b_id, p_id) = negotiating(SessionConfiguration::default().with_auto_advance(false));
        s.submit_response(accept(p_id, a_id), t0()).unwrap();
        s.submit_response(accept(p_id, b_id), t0()).unwrap();
        s.terminate(NegotiationOutcome::AgreementReached, TerminationReason::MutualAgreement, None, t0())
            .unwrap();
        let visited: Vec<NegotiationPhase> = s.phase_history().iter().map(|c| c.to).collect();
        assert!(visited.contains(&NegotiationPhase::Bargaining));
        assert!(visited.contains(&NegotiationPhase::Closing));
        assert_eq!(visited.last(), Some(&NegotiationPhase::Terminated));
        assert!(s
            .pending_events()
            .iter()
            .any(|e| matches!(e.payload, NegotiationEventPayload::Completed { .. })));
    }

    #[test]
    fn terminated_session_rejects_mutations() {
        let mut s = session_with(SessionConfiguration::default());
        s.terminate(NegotiationOutcome::Cancelled, TerminationReason::ManualTermination, None, t0())
            .unwrap();
        let err = s.add_party(decision_maker(), t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionInactive);
    }

    // ───────────────────────────────────────────────────────────────
    // Timeouts
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn warning_is_issued_once() {
        let mut s = session_with(SessionConfiguration::default());
        let expected = s.status().expected_completion_at().unwrap();
        assert_eq!(s.check_timeout(expected.minus_hours(10)).unwrap(), TimeoutCheck::OnTrack);
        assert!(matches!(
            s.check_timeout(expected.minus_hours(2)).unwrap(),
            TimeoutCheck::WarningIssued { .. }
        ));
        assert_eq!(s.check_timeout(expected.minus_hours(1)).unwrap(), TimeoutCheck::OnTrack);
    }

    #[test]
    fn past_deadline_times_out() {
        let mut s = session_with(SessionConfiguration::default());
        let expected = s.status().expected_completion_at().unwrap();
        assert_eq!(s.check_timeout(expected.plus_secs(1)).unwrap(), TimeoutCheck::TimedOut);
        assert_eq!(s.outcome(), NegotiationOutcome::Timeout);
        assert_eq!(s.status().termination_reason(), Some(TerminationReason::TimeoutExceeded));
        assert_eq!(s.check_timeout(expected.plus_hours(1)).unwrap(), TimeoutCheck::Inactive);
    }

    // ───────────────────────────────────────────────────────────────
    // Outbox and versioning
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn drain_keeps_events_until_committed() {
        let mut s = session_with(SessionConfiguration::default());
        let drained = s.drain_events();
        assert_eq!(drained.len(), 1);
        assert_eq!(s.pending_events().len(), 1);
        s.mark_committed();
        assert!(s.pending_events().is_empty());
    }

    #[test]
    fn failed_operation_leaves_version_unchanged() {
        let mut s = session_with(SessionConfiguration::default());
        let before = s.version();
        let _ = s.advance_phase(NegotiationPhase::Closing, true, None, t0());
        assert_eq!(s.version(), before);
        assert_eq!(s.pending_events().len(), 1);
    }

    // ───────────────────────────────────────────────────────────────
    // Analysis results
    // ───────────────────────────────────────────────────────────────

    fn momentum(score: f64, direction: MomentumDirection, trajectory: Trajectory) -> MomentumAnalysis {
        MomentumAnalysis {
            score: Score::new(score),
            direction,
            velocity: 0.5,
            acceptance_rate: 0.5,
            trajectory,
            response_count: 2,
        }
    }

    #[test]
    fn breakthrough_requires_turnaround() {
        let mut s = session_with(SessionConfiguration::default());
        s.record_metrics(momentum(40.0, MomentumDirection::Negative, Trajectory::AtRisk), t0())
            .unwrap();
        s.mark_committed();
        s.record_metrics(momentum(75.0, MomentumDirection::Positive, Trajectory::Progressing), t0())
            .unwrap();
        assert!(s
            .pending_events()
            .iter()
            .any(|e| matches!(e.payload, NegotiationEventPayload::BreakthroughAchieved { .. })));
    }

    #[test]
    fn deadlocked_trajectory_emits_deadlock() {
        let mut s = session_with(SessionConfiguration::default());
        s.record_metrics(momentum(10.0, MomentumDirection::Negative, Trajectory::Deadlocked), t0())
            .unwrap();
        assert!(s
            .pending_events()
            .iter()
            .any(|e| matches!(e.payload, NegotiationEventPayload::DeadlockDetected { .. })));
    }

    #[test]
    fn record_conflicts_emits_one_event_per_conflict() {
        let (mut s, a_id, b_id, _) = negotiating(SessionConfiguration::default());
        s.mark_committed();
        let conflict = Conflict {
            conflict_type: ConflictType::ResponseConflict,
            severity: ConflictSeverity::High,
            parties: vec![a_id, b_id],
            description: "split".to_string(),
            resolution_suggestions: vec![],
        };
        s.record_conflicts(&[conflict], t0()).unwrap();
        assert_eq!(s.pending_events().len(), 1);
    }
}
