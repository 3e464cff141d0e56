//! Proposal viability analysis.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PartyId, Score, Timestamp};
use crate::domain::negotiation::{Party, ProposalTerms, TermCondition};

use super::NegotiationService;

const BASE_TERM_SCORE: f64 = 60.0;
const EXPERTISE_SWING: f64 = 20.0;
const AUTHORITY_PENALTY: f64 = 25.0;
const CONSTRAINT_PENALTY: f64 = 15.0;

/// How one decision-maker is expected to receive a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyViability {
    pub party_id: PartyId,
    pub acceptance_score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViabilityAnalysis {
    pub overall_viability: Score,
    /// Probability in [0, 1] after derating.
    pub acceptance_probability: f64,
    pub party_scores: Vec<PartyViability>,
    pub risk_factors: Vec<String>,
    pub success_factors: Vec<String>,
    pub critical_issues: Vec<String>,
}

impl ViabilityAnalysis {
    pub fn is_viable(&self) -> bool {
        self.critical_issues.is_empty() && self.acceptance_probability >= 0.5
    }
}

impl NegotiationService {
    /// Estimates how likely the decision-makers are to accept a proposal.
    ///
    /// # Algorithm
    /// Each term starts at 60 for each decision-maker, moves up to ±10 with
    /// the party's expertise in the term's domain, loses 25 when it is
    /// non-negotiable and the party has no authority over its category, and
    /// loses 15 when the party lists the category as non-negotiable. Term
    /// scores are averaged weighted by priority; party scores are averaged
    /// into the overall viability.
    ///
    /// Acceptance probability is the overall viability as a fraction, times
    /// 0.1 if the proposal has expired and times 0.8 with more than five
    /// critical terms.
    ///
    /// # Edge Cases
    /// - No decision-makers: neutral 50 and a critical issue
    pub fn analyze_viability<'a>(
        &self,
        proposal: &ProposalTerms,
        parties: impl IntoIterator<Item = &'a Party>,
        domain: Option<&str>,
        now: Timestamp,
    ) -> ViabilityAnalysis {
        let thresholds = &self.settings().viability;
        let mut risks = Vec::new();
        let mut successes = Vec::new();
        let mut critical = Vec::new();

        let decision_makers: Vec<&Party> = parties.into_iter().filter(|p| p.is_decision_maker()).collect();

        let party_scores: Vec<PartyViability> = decision_makers
            .iter()
            .map(|party| PartyViability {
                party_id: party.id(),
                acceptance_score: party_acceptance(party, proposal, domain, now),
            })
            .collect();

        let overall = if party_scores.is_empty() {
            critical.push("No decision-makers available to accept the proposal".to_string());
            Score::NEUTRAL
        } else {
            let sum: f64 = party_scores.iter().map(|s| s.acceptance_score.value()).sum();
            Score::new(sum / party_scores.len() as f64)
        };

        for (party, viability) in decision_makers.iter().zip(&party_scores) {
            let score = viability.acceptance_score.value();
            if score < thresholds.risk_below {
                risks.push(format!("{} is unlikely to accept (score {:.1})", party.name(), score));
            } else if score >= thresholds.success_at {
                successes.push(format!("{} is likely to accept (score {:.1})", party.name(), score));
            }
            for term in proposal.terms().iter().filter(|t| !t.negotiable) {
                if !party.has_authority_over(&term.category, now) {
                    risks.push(format!(
                        "{} has no authority over non-negotiable term '{}'",
                        party.name(),
                        term.id
                    ));
                }
            }
        }

        let mut probability = overall.as_fraction();
        if proposal.is_expired(now) {
            probability *= thresholds.expired_factor;
            critical.push("Proposal has passed its validity period".to_string());
        }
        let critical_terms = proposal.critical_terms().count();
        if critical_terms > thresholds.max_critical_terms {
            probability *= thresholds.critical_overload_factor;
            risks.push(format!("{} critical terms leave little room to trade", critical_terms));
        }
        if proposal.terms().iter().all(|t| t.negotiable) {
            successes.push("All terms are negotiable".to_string());
        }

        ViabilityAnalysis {
            overall_viability: overall,
            acceptance_probability: probability.clamp(0.0, 1.0),
            party_scores,
            risk_factors: risks,
            success_factors: successes,
            critical_issues: critical,
        }
    }
}

fn party_acceptance(party: &Party, proposal: &ProposalTerms, domain: Option<&str>, now: Timestamp) -> Score {
    let mut weighted = 0.0;
    let mut weights = 0.0;
    for term in proposal.terms() {
        let weight = term.priority.weight();
        weighted += term_score(party, term, domain, now) * weight;
        weights += weight;
    }
    if weights <= 0.0 {
        return Score::NEUTRAL;
    }
    Score::new(weighted / weights)
}

fn term_score(party: &Party, term: &TermCondition, domain: Option<&str>, now: Timestamp) -> f64 {
    let expertise_domain = term.required_expertise.as_deref().or(domain);
    let mut score = BASE_TERM_SCORE + (party.expertise_in(expertise_domain) - 0.5) * EXPERTISE_SWING;
    if !term.negotiable && !party.has_authority_over(&term.category, now) {
        score -= AUTHORITY_PENALTY;
    }
    if party
        .constraints()
        .non_negotiable_categories
        .iter()
        .any(|c| c.eq_ignore_ascii_case(&term.category))
    {
        score -= CONSTRAINT_PENALTY;
    }
    score.clamp(0.0, 100.0)
}
