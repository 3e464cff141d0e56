//! Pairwise party compatibility scoring.

use crate::domain::foundation::Score;
use crate::domain::negotiation::{AuthorityLevel, Party};

use super::NegotiationService;

impl NegotiationService {
    /// Scores how well two parties are likely to work together.
    ///
    /// # Algorithm
    /// `50 + 50 * Σ(weight_i * factor_i)` where each factor lies in [-1, 1]:
    /// authority combination, communication-style pair, negotiation-style
    /// pair, expertise balance (lower / higher power score) and the share of
    /// availability hours the two have in common.
    ///
    /// # Edge Cases
    /// - Same party on both sides: 0
    /// - No domain: expertise is averaged over all capabilities
    pub fn compatibility(&self, a: &Party, b: &Party, domain: Option<&str>) -> Score {
        if a.id() == b.id() {
            return Score::ZERO;
        }
        let weights = &self.settings().compatibility;

        let authority = authority_factor(a, b);
        let communication = a
            .preferences()
            .communication_style
            .affinity(b.preferences().communication_style);
        let negotiation = a
            .preferences()
            .negotiation_style
            .affinity(b.preferences().negotiation_style);
        let expertise = expertise_balance(a, b, domain);
        let time = time_overlap_factor(a, b);

        let weighted = weights.authority * authority
            + weights.communication_style * communication
            + weights.negotiation_style * negotiation
            + weights.expertise * expertise
            + weights.time * time;

        Score::new(50.0 + 50.0 * weighted)
    }
}

/// Both decision-makers score highest; an observer on either side lowest.
fn authority_factor(a: &Party, b: &Party) -> f64 {
    let observers = [a, b]
        .iter()
        .filter(|p| p.authority() == AuthorityLevel::Observer)
        .count();
    if observers > 0 {
        return -0.5 * observers as f64;
    }
    match (a.is_decision_maker(), b.is_decision_maker()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.5,
        (false, false) if a.can_make_binding_decisions() && b.can_make_binding_decisions() => 0.25,
        (false, false) => 0.0,
    }
}

fn expertise_balance(a: &Party, b: &Party, domain: Option<&str>) -> f64 {
    let pa = a.power_score(domain).value();
    let pb = b.power_score(domain).value();
    let (low, high) = if pa < pb { (pa, pb) } else { (pb, pa) };
    let ratio = if high <= f64::EPSILON { 1.0 } else { low / high };
    2.0 * ratio - 1.0
}

fn time_overlap_factor(a: &Party, b: &Party) -> f64 {
    let ta = &a.preferences().time;
    let tb = &b.preferences().time;
    let span = |mask: [bool; 24]| mask.iter().filter(|h| **h).count() as f64;
    let shortest = span(ta.utc_hours()).min(span(tb.utc_hours()));
    if shortest <= 0.0 {
        return -1.0;
    }
    let ratio = f64::from(ta.overlap_hours(tb)) / shortest;
    2.0 * ratio.min(1.0) - 1.0
}
