//! Conflict detection across parties and responses.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::foundation::{PartyId, ProposalId};
use crate::domain::negotiation::{Party, ProposalResponse, ResponseType, TimePressure};

use super::NegotiationService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    StyleIncompatibility,
    MissingDecisionAuthority,
    AuthorityImbalance,
    ResponseConflict,
    CulturalMismatch,
    TimePressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConflictSeverity {
    /// Health points deducted per conflict of this severity.
    pub fn health_penalty(&self) -> f64 {
        match self {
            ConflictSeverity::Low => 5.0,
            ConflictSeverity::Medium => 10.0,
            ConflictSeverity::High => 15.0,
            ConflictSeverity::Critical => 20.0,
        }
    }
}

/// A detected source of friction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub parties: Vec<PartyId>,
    pub description: String,
    pub resolution_suggestions: Vec<String>,
}

const STYLE_CONFLICT_BELOW: f64 = -0.4;
const STYLE_CONFLICT_HIGH_AT: f64 = -0.8;
const AUTHORITY_IMBALANCE_RATIO: f64 = 2.5;
const SESSION_LENGTH_SPREAD: f64 = 3.0;

impl NegotiationService {
    /// Finds conflicts between parties and across their responses.
    ///
    /// # Rules
    /// - Style pair affinity below -0.4: `StyleIncompatibility`, high at -0.8
    /// - No decision-maker among the parties: `MissingDecisionAuthority`
    /// - Decision-maker power ratio above 2.5: `AuthorityImbalance`
    /// - Accept and reject on the same proposal: one `ResponseConflict`
    /// - Non-empty, disjoint cultural considerations: `CulturalMismatch`
    /// - Session lengths more than 3x apart, or low vs urgent time
    ///   pressure: one `TimePressure`
    ///
    /// # Edge Cases
    /// - No parties: only response conflicts are reported
    pub fn detect_conflicts<'a>(
        &self,
        parties: impl IntoIterator<Item = &'a Party>,
        responses: impl IntoIterator<Item = &'a ProposalResponse>,
    ) -> Vec<Conflict> {
        let parties: Vec<&Party> = parties.into_iter().collect();
        let mut conflicts = Vec::new();

        style_conflicts(&parties, &mut conflicts);
        authority_conflicts(&parties, &mut conflicts);
        response_conflicts(responses, &mut conflicts);
        cultural_conflicts(&parties, &mut conflicts);
        time_conflicts(&parties, &mut conflicts);

        conflicts
    }
}

fn pairs<'a>(parties: &'a [&'a Party]) -> impl Iterator<Item = (&'a Party, &'a Party)> {
    parties
        .iter()
        .enumerate()
        .flat_map(move |(i, a)| parties[i + 1..].iter().map(move |b| (*a, *b)))
}

fn style_conflicts(parties: &[&Party], out: &mut Vec<Conflict>) {
    for (a, b) in pairs(parties) {
        let (pa, pb) = (a.preferences(), b.preferences());
        let affinity = pa
            .negotiation_style
            .affinity(pb.negotiation_style)
            .min(pa.communication_style.affinity(pb.communication_style));
        if affinity >= STYLE_CONFLICT_BELOW {
            continue;
        }
        let severity = if affinity <= STYLE_CONFLICT_HIGH_AT {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Medium
        };
        out.push(Conflict {
            conflict_type: ConflictType::StyleIncompatibility,
            severity,
            parties: vec![a.id(), b.id()],
            description: format!(
                "{} ({:?}/{:?}) and {} ({:?}/{:?}) have clashing styles",
                a.name(),
                pa.negotiation_style,
                pa.communication_style,
                b.name(),
                pb.negotiation_style,
                pb.communication_style
            ),
            resolution_suggestions: vec![
                "Agree on explicit ground rules for exchanges".to_string(),
                "Route contentious points through a mediator".to_string(),
            ],
        });
    }
}

fn authority_conflicts(parties: &[&Party], out: &mut Vec<Conflict>) {
    if parties.is_empty() {
        return;
    }
    let decision_makers: Vec<&Party> = parties.iter().copied().filter(|p| p.is_decision_maker()).collect();
    if decision_makers.is_empty() {
        out.push(Conflict {
            conflict_type: ConflictType::MissingDecisionAuthority,
            severity: ConflictSeverity::Critical,
            parties: parties.iter().map(|p| p.id()).collect(),
            description: "No party can make binding decisions".to_string(),
            resolution_suggestions: vec![
                "Invite a party with full or executive authority".to_string(),
                "Obtain a mandate for the terms under discussion".to_string(),
            ],
        });
        return;
    }

    let scored: Vec<(&Party, f64)> = decision_makers
        .iter()
        .map(|p| (*p, p.power_score(None).value()))
        .collect();
    let strongest = scored.iter().max_by(|x, y| x.1.total_cmp(&y.1));
    let weakest = scored.iter().min_by(|x, y| x.1.total_cmp(&y.1));
    if let (Some((strong, high)), Some((weak, low))) = (strongest, weakest) {
        let ratio = if *low <= f64::EPSILON { f64::INFINITY } else { high / low };
        if strong.id() != weak.id() && ratio > AUTHORITY_IMBALANCE_RATIO {
            out.push(Conflict {
                conflict_type: ConflictType::AuthorityImbalance,
                severity: ConflictSeverity::Medium,
                parties: vec![strong.id(), weak.id()],
                description: format!("Decision power ratio of {:.1} between {} and {}", ratio, strong.name(), weak.name()),
                resolution_suggestions: vec![
                    "Use objective criteria to anchor terms".to_string(),
                    "Give the weaker party advisory support".to_string(),
                ],
            });
        }
    }
}

fn response_conflicts<'a>(responses: impl IntoIterator<Item = &'a ProposalResponse>, out: &mut Vec<Conflict>) {
    let mut by_proposal: BTreeMap<ProposalId, (Vec<PartyId>, Vec<PartyId>)> = BTreeMap::new();
    for response in responses {
        let entry = by_proposal.entry(response.proposal_id()).or_default();
        match response.response() {
            ResponseType::Accept => entry.0.push(response.responder()),
            ResponseType::Reject => entry.1.push(response.responder()),
            _ => {}
        }
    }
    for (proposal_id, (accepted, rejected)) in by_proposal {
        if accepted.is_empty() || rejected.is_empty() {
            continue;
        }
        out.push(Conflict {
            conflict_type: ConflictType::ResponseConflict,
            severity: ConflictSeverity::High,
            description: format!(
                "Proposal {} accepted by {} and rejected by {} parties",
                proposal_id,
                accepted.len(),
                rejected.len()
            ),
            parties: accepted.into_iter().chain(rejected).collect(),
            resolution_suggestions: vec![
                "Identify the terms driving rejection".to_string(),
                "Prepare a revised proposal addressing rejected terms".to_string(),
            ],
        });
    }
}

fn cultural_conflicts(parties: &[&Party], out: &mut Vec<Conflict>) {
    for (a, b) in pairs(parties) {
        let ca = &a.preferences().cultural_considerations;
        let cb = &b.preferences().cultural_considerations;
        if ca.is_empty() || cb.is_empty() || !ca.is_disjoint(cb) {
            continue;
        }
        out.push(Conflict {
            conflict_type: ConflictType::CulturalMismatch,
            severity: ConflictSeverity::Low,
            parties: vec![a.id(), b.id()],
            description: format!("{} and {} share no cultural considerations", a.name(), b.name()),
            resolution_suggestions: vec!["Brief both sides on each other's customs".to_string()],
        });
    }
}

fn time_conflicts(parties: &[&Party], out: &mut Vec<Conflict>) {
    if parties.len() < 2 {
        return;
    }
    let lengths: Vec<f64> = parties
        .iter()
        .map(|p| f64::from(p.preferences().time.max_session_hours))
        .collect();
    let longest = lengths.iter().cloned().fold(f64::MIN, f64::max);
    let shortest = lengths.iter().cloned().fold(f64::MAX, f64::min);
    let pressures: BTreeSet<TimePressure> = parties.iter().map(|p| p.preferences().time.time_pressure).collect();

    let length_spread = shortest > 0.0 && longest / shortest > SESSION_LENGTH_SPREAD;
    let pressure_gap = pressures.contains(&TimePressure::Low) && pressures.contains(&TimePressure::Urgent);
    if !length_spread && !pressure_gap {
        return;
    }
    let description = if pressure_gap {
        "Parties operate under very different time pressure".to_string()
    } else {
        format!("Preferred session lengths range from {}h to {}h", shortest, longest)
    };
    out.push(Conflict {
        conflict_type: ConflictType::TimePressure,
        severity: ConflictSeverity::Medium,
        parties: parties.iter().map(|p| p.id()).collect(),
        description,
        resolution_suggestions: vec![
            "Agree on a shared timeline with interim milestones".to_string(),
            "Split long sessions into shorter rounds".to_string(),
        ],
    });
}
