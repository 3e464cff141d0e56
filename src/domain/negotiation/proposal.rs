//! ProposalTerms value object - an offer made up of dependent term conditions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::domain::foundation::{ProposalId, TermId, Timestamp, ValidationError};

/// Kind of proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalType {
    Initial,
    Counter,
    Revised,
    Final,
}

/// Importance of a term to the proposer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TermPriority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl TermPriority {
    /// Numeric weight (1-4) used by scoring.
    pub fn weight(&self) -> f64 {
        *self as u8 as f64
    }
}

/// One condition inside a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermCondition {
    pub id: TermId,
    pub category: String,
    pub description: String,
    pub value: Option<serde_json::Value>,
    pub priority: TermPriority,
    pub negotiable: bool,
    #[serde(default)]
    pub dependencies: BTreeSet<TermId>,
    pub required_expertise: Option<String>,
}

impl TermCondition {
    /// Creates a negotiable, medium-priority term.
    pub fn new(
        id: TermId,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let category = category.into();
        if category.trim().is_empty() {
            return Err(ValidationError::empty_field("term.category"));
        }
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ValidationError::empty_field("term.description"));
        }
        Ok(Self {
            id,
            category,
            description,
            value: None,
            priority: TermPriority::Medium,
            negotiable: true,
            dependencies: BTreeSet::new(),
            required_expertise: None,
        })
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_priority(mut self, priority: TermPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn non_negotiable(mut self) -> Self {
        self.negotiable = false;
        self
    }

    pub fn negotiable(mut self, negotiable: bool) -> Self {
        self.negotiable = negotiable;
        self
    }

    pub fn depends_on(mut self, term: TermId) -> Self {
        self.dependencies.insert(term);
        self
    }

    pub fn requiring_expertise(mut self, domain: impl Into<String>) -> Self {
        self.required_expertise = Some(domain.into());
        self
    }

    pub fn is_critical(&self) -> bool {
        self.priority == TermPriority::Critical
    }
}

/// A complete proposal.
///
/// # Invariants
///
/// - at least one term
/// - term ids are unique and every dependency refers to a term in the proposal
/// - the dependency graph is acyclic
/// - `validity_period`, when present, lies after `created_at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProposalTermsRecord")]
pub struct ProposalTerms {
    id: ProposalId,
    proposal_type: ProposalType,
    counter_to: Option<ProposalId>,
    title: String,
    summary: String,
    terms: Vec<TermCondition>,
    validity_period: Option<Timestamp>,
    created_at: Timestamp,
    metadata: BTreeMap<String, String>,
}

/// Wire shape of [`ProposalTerms`]; only reaches the domain through `validate`.
#[derive(Deserialize)]
struct ProposalTermsRecord {
    id: ProposalId,
    proposal_type: ProposalType,
    #[serde(default)]
    counter_to: Option<ProposalId>,
    title: String,
    summary: String,
    terms: Vec<TermCondition>,
    #[serde(default)]
    validity_period: Option<Timestamp>,
    created_at: Timestamp,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl TryFrom<ProposalTermsRecord> for ProposalTerms {
    type Error = ValidationError;

    fn try_from(record: ProposalTermsRecord) -> Result<Self, Self::Error> {
        let proposal = Self {
            id: record.id,
            proposal_type: record.proposal_type,
            counter_to: record.counter_to,
            title: record.title,
            summary: record.summary,
            terms: record.terms,
            validity_period: record.validity_period,
            created_at: record.created_at,
            metadata: record.metadata,
        };
        proposal.validate()?;
        Ok(proposal)
    }
}

impl ProposalTerms {
    pub fn new(
        id: ProposalId,
        proposal_type: ProposalType,
        title: impl Into<String>,
        summary: impl Into<String>,
        terms: Vec<TermCondition>,
        validity_period: Option<Timestamp>,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let proposal = Self {
            id,
            proposal_type,
            counter_to: None,
            title: title.into(),
            summary: summary.into(),
            terms,
            validity_period,
            created_at,
            metadata: BTreeMap::new(),
        };
        proposal.validate()?;
        Ok(proposal)
    }

    /// Marks this proposal as a counter to an earlier one.
    pub fn countering(mut self, original: ProposalId) -> Self {
        self.counter_to = Some(original);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        if self.terms.is_empty() {
            return Err(ValidationError::empty_field("terms"));
        }

        let mut ids = HashSet::new();
        for term in &self.terms {
            if !ids.insert(&term.id) {
                return Err(ValidationError::invariant(
                    "proposal.term_ids",
                    format!("duplicate term id '{}'", term.id),
                ));
            }
        }
        for term in &self.terms {
            if let Some(missing) = term.dependencies.iter().find(|d| !ids.contains(d)) {
                return Err(ValidationError::invariant(
                    "proposal.dependencies",
                    format!("term '{}' depends on unknown term '{}'", term.id, missing),
                ));
            }
        }
        if let Some(term) = self.find_cycle() {
            return Err(ValidationError::invariant(
                "proposal.dependencies",
                format!("dependency cycle through term '{}'", term),
            ));
        }

        if let Some(valid_until) = self.validity_period {
            if !valid_until.is_after(&self.created_at) {
                return Err(ValidationError::invariant(
                    "proposal.validity_period",
                    "validity period must end after creation",
                ));
            }
        }
        Ok(())
    }

    /// Depth-first search with visited / in-progress marks.
    fn find_cycle(&self) -> Option<&TermId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        fn visit<'a>(
            id: &'a TermId,
            graph: &HashMap<&'a TermId, &'a BTreeSet<TermId>>,
            marks: &mut HashMap<&'a TermId, Mark>,
        ) -> Option<&'a TermId> {
            match marks.get(id) {
                Some(Mark::InProgress) => return Some(id),
                Some(Mark::Done) => return None,
                None => {}
            }
            marks.insert(id, Mark::InProgress);
            if let Some(deps) = graph.get(id).copied() {
                for dep in deps.iter() {
                    if let Some(hit) = visit(dep, graph, marks) {
                        return Some(hit);
                    }
                }
            }
            marks.insert(id, Mark::Done);
            None
        }

        let graph: HashMap<&TermId, &BTreeSet<TermId>> =
            self.terms.iter().map(|t| (&t.id, &t.dependencies)).collect();
        let mut marks = HashMap::new();
        self.terms
            .iter()
            .find_map(|t| visit(&t.id, &graph, &mut marks))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn proposal_type(&self) -> ProposalType {
        self.proposal_type
    }

    pub fn counter_to(&self) -> Option<ProposalId> {
        self.counter_to
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn terms(&self) -> &[TermCondition] {
        &self.terms
    }

    pub fn term(&self, id: &TermId) -> Option<&TermCondition> {
        self.terms.iter().find(|t| &t.id == id)
    }

    pub fn has_term(&self, id: &TermId) -> bool {
        self.term(id).is_some()
    }

    pub fn validity_period(&self) -> Option<Timestamp> {
        self.validity_period
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.validity_period
            .map(|until| !now.is_before(&until))
            .unwrap_or(false)
    }

    pub fn critical_terms(&self) -> impl Iterator<Item = &TermCondition> {
        self.terms.iter().filter(|t| t.is_critical())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Updates (return new instances)
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns a copy with the term of the same id replaced.
    ///
    /// The result is revalidated, so a replacement that introduces a cycle
    /// or an unknown dependency is rejected.
    pub fn with_updated_term(&self, term: TermCondition) -> Result<Self, ValidationError> {
        let position = self
            .terms
            .iter()
            .position(|t| t.id == term.id)
            .ok_or_else(|| {
                ValidationError::invariant("proposal.terms", format!("unknown term '{}'", term.id))
            })?;
        let mut next = self.clone();
        next.terms[position] = term;
        next.validate()?;
        Ok(next)
    }

    /// Returns a copy with a new validity period.
    pub fn with_validity_period(&self, until: Option<Timestamp>) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        next.validity_period = until;
        next.validate()?;
        Ok(next)
    }
}

impl fmt::Display for ProposalTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} terms)", self.title, self.terms.len())
    }
}
