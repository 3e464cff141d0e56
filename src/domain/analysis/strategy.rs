//! Strategy recommendation from the party mix.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::PartyId;
use crate::domain::negotiation::{
    NegotiationOutcome, NegotiationPhase, NegotiationStyle, Party, TimePressure,
};

use super::NegotiationService;

/// Power ratio above which the session is treated as imbalanced.
const POWER_IMBALANCE_RATIO: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationApproach {
    Collaborative,
    Integrative,
    Diplomatic,
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyStrategy {
    pub party_id: PartyId,
    pub style: NegotiationStyle,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecommendation {
    pub approach: NegotiationApproach,
    /// Highest power score over lowest; 1.0 with fewer than two parties.
    pub power_ratio: f64,
    pub dominant_style: Option<NegotiationStyle>,
    pub phases: Vec<NegotiationPhase>,
    pub tactics: Vec<String>,
    pub risk_mitigations: Vec<String>,
    pub party_strategies: Vec<PartyStrategy>,
}

impl NegotiationService {
    /// Picks an overall approach and per-party guidance.
    ///
    /// # Algorithm
    /// 1. Power ratio = highest / lowest power score; above 2 the approach is
    ///    Diplomatic regardless of styles.
    /// 2. Otherwise a collaborative majority gives Collaborative, a majority
    ///    of cooperative styles (collaborative, accommodating, compromising)
    ///    gives Integrative, anything else Balanced.
    /// 3. Phases run from Preparation to Implementation; they stop at
    ///    Closing when the target outcome is not positive.
    ///
    /// # Edge Cases
    /// - No parties: Balanced with no per-party strategies
    pub fn recommend_strategy<'a>(
        &self,
        parties: impl IntoIterator<Item = &'a Party>,
        domain: Option<&str>,
        target: Option<NegotiationOutcome>,
    ) -> StrategyRecommendation {
        let parties: Vec<&Party> = parties.into_iter().collect();

        let power_ratio = power_ratio(&parties, domain);
        let dominant_style = dominant_style(&parties);
        let majority = |count: usize| !parties.is_empty() && count * 2 > parties.len();
        let collaborative = parties
            .iter()
            .filter(|p| p.preferences().negotiation_style == NegotiationStyle::Collaborative)
            .count();
        let cooperative = parties
            .iter()
            .filter(|p| is_cooperative(p.preferences().negotiation_style))
            .count();

        let approach = if power_ratio > POWER_IMBALANCE_RATIO {
            NegotiationApproach::Diplomatic
        } else if majority(collaborative) {
            NegotiationApproach::Collaborative
        } else if majority(cooperative) {
            NegotiationApproach::Integrative
        } else {
            NegotiationApproach::Balanced
        };

        let positive_target = target.map(|t| t.is_positive()).unwrap_or(true);
        let phases = NegotiationPhase::ALL
            .iter()
            .copied()
            .filter(|p| *p >= NegotiationPhase::Preparation && *p != NegotiationPhase::Terminated)
            .filter(|p| positive_target || *p <= NegotiationPhase::Closing)
            .collect();

        StrategyRecommendation {
            approach,
            power_ratio,
            dominant_style,
            phases,
            tactics: tactics(approach, target),
            risk_mitigations: mitigations(&parties, power_ratio),
            party_strategies: parties.iter().map(|p| party_strategy(p, approach)).collect(),
        }
    }
}

fn is_cooperative(style: NegotiationStyle) -> bool {
    matches!(
        style,
        NegotiationStyle::Collaborative | NegotiationStyle::Accommodating | NegotiationStyle::Compromising
    )
}

fn power_ratio(parties: &[&Party], domain: Option<&str>) -> f64 {
    let powers: Vec<f64> = parties.iter().map(|p| p.power_score(domain).value()).collect();
    let high = powers.iter().copied().fold(f64::MIN, f64::max);
    let low = powers.iter().copied().fold(f64::MAX, f64::min);
    if powers.len() < 2 {
        return 1.0;
    }
    if low <= f64::EPSILON {
        return f64::INFINITY;
    }
    high / low
}

/// Most common style; ties resolve to the style declared first.
fn dominant_style(parties: &[&Party]) -> Option<NegotiationStyle> {
    let mut counts: HashMap<NegotiationStyle, usize> = HashMap::new();
    let mut order = Vec::new();
    for party in parties {
        let style = party.preferences().negotiation_style;
        let count = counts.entry(style).or_insert(0);
        if *count == 0 {
            order.push(style);
        }
        *count += 1;
    }
    let best = order.iter().map(|s| counts[s]).max()?;
    order.into_iter().find(|s| counts[s] == best)
}

fn tactics(approach: NegotiationApproach, target: Option<NegotiationOutcome>) -> Vec<String> {
    let mut tactics: Vec<String> = match approach {
        NegotiationApproach::Collaborative => vec![
            "Open with shared interests before positions".into(),
            "Bundle terms into packages that create joint value".into(),
        ],
        NegotiationApproach::Integrative => vec![
            "Trade low-priority terms for high-priority ones".into(),
            "Explore contingent terms to bridge differing forecasts".into(),
        ],
        NegotiationApproach::Diplomatic => vec![
            "Use a neutral facilitator to balance influence".into(),
            "Agree on objective criteria before discussing terms".into(),
        ],
        NegotiationApproach::Balanced => vec![
            "Anchor with a well-justified initial proposal".into(),
            "Make reciprocal concessions in small steps".into(),
        ],
    };
    match target {
        Some(NegotiationOutcome::PartialAgreement) => {
            tactics.push("Secure agreement on uncontested terms first".into())
        }
        Some(NegotiationOutcome::AgreementReached) => {
            tactics.push("Confirm every decision-maker's acceptance criteria early".into())
        }
        _ => {}
    }
    tactics
}

fn mitigations(parties: &[&Party], power_ratio: f64) -> Vec<String> {
    let mut out = Vec::new();
    if power_ratio > POWER_IMBALANCE_RATIO {
        out.push("Power imbalance: give weaker parties time to consult advisors".to_string());
    }
    if !parties.iter().any(|p| p.is_decision_maker()) {
        out.push("No decision-maker present: confirm who can bind each side".to_string());
    }
    let competitive = parties
        .iter()
        .filter(|p| p.preferences().negotiation_style == NegotiationStyle::Competitive)
        .count();
    if competitive >= 2 {
        out.push("Several competitive parties: set ground rules for concessions".to_string());
    }
    if parties
        .iter()
        .any(|p| p.preferences().time.time_pressure >= TimePressure::High)
    {
        out.push("Deadline pressure: agree on a timetable for each phase".to_string());
    }
    out
}

fn party_strategy(party: &Party, approach: NegotiationApproach) -> PartyStrategy {
    let style = party.preferences().negotiation_style;
    let base = match style {
        NegotiationStyle::Collaborative => "Invite joint problem solving",
        NegotiationStyle::Competitive => "Keep firm positions tied to objective criteria",
        NegotiationStyle::Accommodating => "Make sure their own interests are stated",
        NegotiationStyle::Avoiding => "Schedule short focused sessions with clear agendas",
        NegotiationStyle::Compromising => "Offer balanced trades early",
    };
    let recommendation = if approach == NegotiationApproach::Diplomatic && !party.can_make_binding_decisions() {
        format!("{}; route decisions through an authorised representative", base)
    } else {
        base.to_string()
    };
    PartyStrategy {
        party_id: party.id(),
        style,
        recommendation,
    }
}
