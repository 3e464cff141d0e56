//! Term optimization: suggest relaxations that raise acceptance.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TermId, Timestamp};
use crate::domain::negotiation::{Party, ProposalTerms, TermCondition, TermPriority};

use super::NegotiationService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationReason {
    /// Non-negotiable although not critical.
    UnnecessarilyRigid,
    /// Low priority yet tied to other terms.
    LowPriorityDependencies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationDifficulty {
    None,
    Low,
    Medium,
    High,
}

impl ImplementationDifficulty {
    fn for_changes(changed: usize) -> Self {
        match changed {
            0 => ImplementationDifficulty::None,
            1..=2 => ImplementationDifficulty::Low,
            3..=5 => ImplementationDifficulty::Medium,
            _ => ImplementationDifficulty::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermOptimization {
    pub term_id: TermId,
    pub reasons: Vec<OptimizationReason>,
    pub original: TermCondition,
    pub suggested: TermCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermOptimizationResult {
    pub optimizations: Vec<TermOptimization>,
    /// The proposal with every suggestion applied; `None` when nothing changed.
    pub optimized_proposal: Option<ProposalTerms>,
    pub original_probability: f64,
    pub optimized_probability: f64,
    /// Optimized minus original acceptance probability.
    pub predicted_delta: f64,
    pub difficulty: ImplementationDifficulty,
}

impl NegotiationService {
    /// Suggests term changes and predicts their effect on acceptance.
    ///
    /// # Algorithm
    /// 1. A non-critical, non-negotiable term is suggested as negotiable.
    /// 2. A low-priority term with dependencies has them cleared.
    /// 3. All suggestions are applied to a copy of the proposal and viability
    ///    is re-run on both; the delta is the probability difference.
    /// 4. Difficulty scales with the number of changed terms.
    pub fn optimize_terms<'a>(
        &self,
        proposal: &ProposalTerms,
        parties: impl IntoIterator<Item = &'a Party>,
        domain: Option<&str>,
        now: Timestamp,
    ) -> TermOptimizationResult {
        let parties: Vec<&Party> = parties.into_iter().collect();
        let original_probability = self
            .analyze_viability(proposal, parties.iter().copied(), domain, now)
            .acceptance_probability;

        let mut optimizations = Vec::new();
        let mut optimized = proposal.clone();
        for term in proposal.terms() {
            let Some((reasons, suggested)) = suggest(term) else {
                continue;
            };
            // rejected replacements are skipped
            match optimized.with_updated_term(suggested.clone()) {
                Ok(next) => optimized = next,
                Err(_) => continue,
            }
            optimizations.push(TermOptimization {
                term_id: term.id.clone(),
                reasons,
                original: term.clone(),
                suggested,
            });
        }

        let (optimized_proposal, optimized_probability) = if optimizations.is_empty() {
            (None, original_probability)
        } else {
            let probability = self
                .analyze_viability(&optimized, parties.iter().copied(), domain, now)
                .acceptance_probability;
            (Some(optimized), probability)
        };

        TermOptimizationResult {
            difficulty: ImplementationDifficulty::for_changes(optimizations.len()),
            optimizations,
            optimized_proposal,
            original_probability,
            optimized_probability,
            predicted_delta: optimized_probability - original_probability,
        }
    }
}

fn suggest(term: &TermCondition) -> Option<(Vec<OptimizationReason>, TermCondition)> {
    let mut reasons = Vec::new();
    let mut suggested = term.clone();
    if !term.negotiable && !term.is_critical() {
        reasons.push(OptimizationReason::UnnecessarilyRigid);
        suggested.negotiable = true;
    }
    if term.priority == TermPriority::Low && !term.dependencies.is_empty() {
        reasons.push(OptimizationReason::LowPriorityDependencies);
        suggested.dependencies.clear();
    }
    if reasons.is_empty() {
        None
    } else {
        Some((reasons, suggested))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EntityId, PartyId, ProposalId};
    use crate::domain::negotiation::{AuthorityLevel, PartyRole, ProposalType};

    fn term(id: &str) -> TermCondition {
        TermCondition::new(TermId::new(id).unwrap(), "delivery", id).unwrap()
    }

    fn proposal(terms: Vec<TermCondition>) -> ProposalTerms {
        let now = Timestamp::now();
        ProposalTerms::new(ProposalId::new(), ProposalType::Initial, "Offer", "", terms, None, now).unwrap()
    }

    fn decision_maker() -> Party {
        Party::new(
            PartyId::new(),
            EntityId::new("buyer").unwrap(),
            "Buyer",
            PartyRole::Respondent,
            AuthorityLevel::Full,
        )
        .unwrap()
    }

    #[test]
    fn nothing_to_optimize() {
        let service = NegotiationService::default();
        let p = proposal(vec![term("a"), term("b").with_priority(TermPriority::Critical).non_negotiable()]);
        let dm = decision_maker();
        let result = service.optimize_terms(&p, [&dm], None, Timestamp::now());
        assert!(result.optimizations.is_empty());
        assert!(result.optimized_proposal.is_none());
        assert_eq!(result.predicted_delta, 0.0);
        assert_eq!(result.difficulty, ImplementationDifficulty::None);
    }

    #[test]
    fn rigid_term_is_relaxed_and_improves_acceptance() {
        let service = NegotiationService::default();
        let p = proposal(vec![term("a").non_negotiable()]);
        let dm = decision_maker();
        let result = service.optimize_terms(&p, [&dm], None, Timestamp::now());

        assert_eq!(result.optimizations.len(), 1);
        let opt = &result.optimizations[0];
        assert_eq!(opt.reasons, vec![OptimizationReason::UnnecessarilyRigid]);
        assert!(opt.suggested.negotiable);
        // 35 -> 60 for a full-authority party without a mandate
        assert!((result.original_probability - 0.35).abs() < 1e-9);
        assert!((result.predicted_delta - 0.25).abs() < 1e-9);
        assert_eq!(result.difficulty, ImplementationDifficulty::Low);
    }

    #[test]
    fn low_priority_dependencies_are_cleared() {
        let service = NegotiationService::default();
        let p = proposal(vec![
            term("base"),
            term("extra")
                .with_priority(TermPriority::Low)
                .depends_on(TermId::new("base").unwrap()),
        ]);
        let result = service.optimize_terms(&p, Vec::<&Party>::new(), None, Timestamp::now());
        assert_eq!(result.optimizations.len(), 1);
        let optimized = result.optimized_proposal.unwrap();
        let extra = optimized.term(&TermId::new("extra").unwrap()).unwrap();
        assert!(extra.dependencies.is_empty());
        // only the changed term differs
        assert_eq!(optimized.term(&TermId::new("base").unwrap()), p.term(&TermId::new("base").unwrap()));
    }

    #[test]
    fn difficulty_scales_with_changes() {
        assert_eq!(ImplementationDifficulty::for_changes(2), ImplementationDifficulty::Low);
        assert_eq!(ImplementationDifficulty::for_changes(3), ImplementationDifficulty::Medium);
        assert_eq!(ImplementationDifficulty::for_changes(6), ImplementationDifficulty::High);
    }
}
