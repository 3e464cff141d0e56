//! Party value object - a participant in a negotiation.
//!
//! A party wraps a backing entity (person, company, agent) with the role it
//! plays in one session, its authority, capabilities and preferences.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::domain::foundation::{EntityId, PartyId, Score, Timestamp, ValidationError};

// ─────────────────────────────────────────────────────────────────────────────
// Role and authority
// ─────────────────────────────────────────────────────────────────────────────

/// Role a party plays in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyRole {
    Initiator,
    Respondent,
    Mediator,
    Advisor,
    Observer,
}

impl PartyRole {
    /// Roles that may hold decision-making power.
    pub fn is_decision_role(&self) -> bool {
        matches!(self, PartyRole::Initiator | PartyRole::Respondent)
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PartyRole::Initiator => "INITIATOR",
            PartyRole::Respondent => "RESPONDENT",
            PartyRole::Mediator => "MEDIATOR",
            PartyRole::Advisor => "ADVISOR",
            PartyRole::Observer => "OBSERVER",
        };
        write!(f, "{}", s)
    }
}

/// How much a party may commit on behalf of its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorityLevel {
    Observer,
    Advisory,
    Limited,
    Full,
    Executive,
}

impl AuthorityLevel {
    /// True for authority levels that can bind the entity.
    pub fn can_bind(&self) -> bool {
        matches!(self, AuthorityLevel::Full | AuthorityLevel::Executive)
    }

    /// Relative weight in [0, 1] used by power scoring.
    pub fn weight(&self) -> f64 {
        match self {
            AuthorityLevel::Observer => 0.0,
            AuthorityLevel::Advisory => 0.25,
            AuthorityLevel::Limited => 0.5,
            AuthorityLevel::Full => 0.8,
            AuthorityLevel::Executive => 1.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Styles
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunicationStyle {
    Direct,
    #[default]
    Diplomatic,
    Analytical,
    Expressive,
    Formal,
    Informal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationStyle {
    #[default]
    Collaborative,
    Competitive,
    Accommodating,
    Avoiding,
    Compromising,
}

/// Pair scores in [-1, 1]. Only one orientation of each pair is stored.
static COMMUNICATION_PAIRS: Lazy<HashMap<(CommunicationStyle, CommunicationStyle), f64>> =
    Lazy::new(|| {
        use CommunicationStyle::*;
        HashMap::from([
            ((Direct, Direct), 0.6),
            ((Direct, Diplomatic), -0.2),
            ((Direct, Analytical), 0.5),
            ((Direct, Expressive), 0.1),
            ((Direct, Formal), 0.2),
            ((Direct, Informal), 0.4),
            ((Diplomatic, Diplomatic), 0.7),
            ((Diplomatic, Analytical), 0.3),
            ((Diplomatic, Expressive), 0.3),
            ((Diplomatic, Formal), 0.6),
            ((Diplomatic, Informal), 0.1),
            ((Analytical, Analytical), 0.8),
            ((Analytical, Expressive), -0.5),
            ((Analytical, Formal), 0.5),
            ((Analytical, Informal), -0.1),
            ((Expressive, Expressive), 0.5),
            ((Expressive, Formal), -0.4),
            ((Expressive, Informal), 0.6),
            ((Formal, Formal), 0.7),
            ((Formal, Informal), -0.6),
            ((Informal, Informal), 0.6),
        ])
    });

static NEGOTIATION_PAIRS: Lazy<HashMap<(NegotiationStyle, NegotiationStyle), f64>> =
    Lazy::new(|| {
        use NegotiationStyle::*;
        HashMap::from([
            ((Collaborative, Collaborative), 1.0),
            ((Collaborative, Competitive), -0.3),
            ((Collaborative, Accommodating), 0.6),
            ((Collaborative, Avoiding), -0.2),
            ((Collaborative, Compromising), 0.7),
            ((Competitive, Competitive), -0.6),
            ((Competitive, Accommodating), 0.2),
            ((Competitive, Avoiding), -1.0),
            ((Competitive, Compromising), 0.1),
            ((Accommodating, Accommodating), 0.5),
            ((Accommodating, Avoiding), -0.1),
            ((Accommodating, Compromising), 0.6),
            ((Avoiding, Avoiding), -0.5),
            ((Avoiding, Compromising), 0.0),
            ((Compromising, Compromising), 0.7),
        ])
    });

fn symmetric_lookup<K: Copy + Eq + std::hash::Hash>(table: &HashMap<(K, K), f64>, a: K, b: K) -> f64 {
    table
        .get(&(a, b))
        .or_else(|| table.get(&(b, a)))
        .copied()
        .unwrap_or(0.0)
}

impl CommunicationStyle {
    /// Pair affinity in [-1, 1], symmetric.
    pub fn affinity(self, other: CommunicationStyle) -> f64 {
        symmetric_lookup(&COMMUNICATION_PAIRS, self, other)
    }
}

impl NegotiationStyle {
    /// Pair affinity in [-1, 1], symmetric.
    pub fn affinity(self, other: NegotiationStyle) -> f64 {
        symmetric_lookup(&NEGOTIATION_PAIRS, self, other)
    }

    /// Pairs at the bottom of the scale cannot share a session.
    pub fn blocks(self, other: NegotiationStyle) -> bool {
        self.affinity(other) <= -1.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Preferences
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimePressure {
    Low,
    #[default]
    Moderate,
    High,
    Urgent,
}

/// Availability window expressed in the party's local hours.
///
/// `available_from_hour == available_until_hour` means around the clock;
/// `from > until` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePreferences {
    pub utc_offset_hours: i8,
    pub available_from_hour: u8,
    pub available_until_hour: u8,
    pub max_session_hours: u32,
    pub time_pressure: TimePressure,
}

impl Default for TimePreferences {
    fn default() -> Self {
        Self {
            utc_offset_hours: 0,
            available_from_hour: 9,
            available_until_hour: 17,
            max_session_hours: 8,
            time_pressure: TimePressure::Moderate,
        }
    }
}

impl TimePreferences {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ValidationError::out_of_range(
                "utc_offset_hours",
                -12,
                14,
                self.utc_offset_hours as i64,
            ));
        }
        for (field, hour) in [
            ("available_from_hour", self.available_from_hour),
            ("available_until_hour", self.available_until_hour),
        ] {
            if hour > 23 {
                return Err(ValidationError::out_of_range(field, 0, 23, hour as i64));
            }
        }
        if self.max_session_hours == 0 {
            return Err(ValidationError::out_of_range(
                "max_session_hours",
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        Ok(())
    }

    /// Hours of the UTC day during which the party is available.
    pub fn utc_hours(&self) -> [bool; 24] {
        let mut mask = [false; 24];
        let from = self.available_from_hour as i32;
        let until = self.available_until_hour as i32;
        let span = if from == until { 24 } else { (until - from).rem_euclid(24) };
        for step in 0..span {
            let utc = (from + step - self.utc_offset_hours as i32).rem_euclid(24);
            mask[utc as usize] = true;
        }
        mask
    }

    /// Number of UTC hours both parties are available.
    pub fn overlap_hours(&self, other: &TimePreferences) -> u32 {
        let a = self.utc_hours();
        let b = other.utc_hours();
        a.iter().zip(b.iter()).filter(|(x, y)| **x && **y).count() as u32
    }
}

/// How a party prefers to communicate and negotiate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyPreferences {
    pub primary_language: String,
    #[serde(default)]
    pub secondary_languages: BTreeSet<String>,
    #[serde(default)]
    pub communication_style: CommunicationStyle,
    #[serde(default)]
    pub negotiation_style: NegotiationStyle,
    #[serde(default)]
    pub time: TimePreferences,
    #[serde(default)]
    pub cultural_considerations: BTreeSet<String>,
}

impl Default for PartyPreferences {
    fn default() -> Self {
        Self {
            primary_language: "en".to_string(),
            secondary_languages: BTreeSet::new(),
            communication_style: CommunicationStyle::default(),
            negotiation_style: NegotiationStyle::default(),
            time: TimePreferences::default(),
            cultural_considerations: BTreeSet::new(),
        }
    }
}

impl PartyPreferences {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.primary_language.trim().is_empty() {
            return Err(ValidationError::empty_field("primary_language"));
        }
        self.time.validate()
    }

    /// Primary plus secondary languages, lower-cased.
    pub fn languages(&self) -> BTreeSet<String> {
        std::iter::once(&self.primary_language)
            .chain(self.secondary_languages.iter())
            .map(|l| l.trim().to_lowercase())
            .collect()
    }

    pub fn shares_language_with(&self, other: &PartyPreferences) -> bool {
        !self.languages().is_disjoint(&other.languages())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities, constraints, mandates
// ─────────────────────────────────────────────────────────────────────────────

/// A named area of expertise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub domain: String,
    pub expertise: Score,
}

impl Capability {
    pub fn new(name: impl Into<String>, domain: impl Into<String>, expertise: f64) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("capability.name"));
        }
        let domain = domain.into();
        if domain.trim().is_empty() {
            return Err(ValidationError::empty_field("capability.domain"));
        }
        Ok(Self {
            name,
            domain,
            expertise: Score::new(expertise),
        })
    }

    fn matches_domain(&self, domain: &str) -> bool {
        self.domain.eq_ignore_ascii_case(domain) || self.name.eq_ignore_ascii_case(domain)
    }
}

/// Limits a party brings into the negotiation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartyConstraints {
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub deadline: Option<Timestamp>,
    /// Term categories the party will not negotiate on.
    #[serde(default)]
    pub non_negotiable_categories: BTreeSet<String>,
    #[serde(default)]
    pub required_approvals: Vec<String>,
}

impl PartyConstraints {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(min), Some(max)) = (self.budget_min, self.budget_max) {
            if min > max {
                return Err(ValidationError::invariant(
                    "constraints.budget",
                    format!("budget_min {} exceeds budget_max {}", min, max),
                ));
            }
        }
        Ok(())
    }
}

/// Delegated authority over a category of terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mandate {
    pub term_category: String,
    pub limit: Option<f64>,
    pub expires_at: Option<Timestamp>,
}

impl Mandate {
    pub fn covers(&self, category: &str, now: Timestamp) -> bool {
        self.term_category.eq_ignore_ascii_case(category)
            && self.expires_at.map(|e| now.is_before(&e)).unwrap_or(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Party
// ─────────────────────────────────────────────────────────────────────────────

/// A participant in a negotiation session.
///
/// # Invariants
///
/// - `Observer` role carries `Observer` authority only
/// - capability names are unique (case-insensitive)
/// - reputation modifiers lie in [-100, 100]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PartyRecord")]
pub struct Party {
    id: PartyId,
    entity_id: EntityId,
    name: String,
    role: PartyRole,
    authority: AuthorityLevel,
    capabilities: Vec<Capability>,
    preferences: PartyPreferences,
    constraints: PartyConstraints,
    reputation_modifiers: BTreeMap<String, i32>,
    mandates: Vec<Mandate>,
}

#[derive(Deserialize)]
struct PartyRecord {
    id: PartyId,
    entity_id: EntityId,
    name: String,
    role: PartyRole,
    authority: AuthorityLevel,
    #[serde(default)]
    capabilities: Vec<Capability>,
    #[serde(default)]
    preferences: PartyPreferences,
    #[serde(default)]
    constraints: PartyConstraints,
    #[serde(default)]
    reputation_modifiers: BTreeMap<String, i32>,
    #[serde(default)]
    mandates: Vec<Mandate>,
}

impl TryFrom<PartyRecord> for Party {
    type Error = ValidationError;

    fn try_from(record: PartyRecord) -> Result<Self, Self::Error> {
        let party = Self {
            id: record.id,
            entity_id: record.entity_id,
            name: record.name,
            role: record.role,
            authority: record.authority,
            capabilities: record.capabilities,
            preferences: record.preferences,
            constraints: record.constraints,
            reputation_modifiers: record.reputation_modifiers,
            mandates: record.mandates,
        };
        party.validate()?;
        Ok(party)
    }
}

impl Party {
    /// Creates a party with default preferences and no capabilities.
    pub fn new(
        id: PartyId,
        entity_id: EntityId,
        name: impl Into<String>,
        role: PartyRole,
        authority: AuthorityLevel,
    ) -> Result<Self, ValidationError> {
        let party = Self {
            id,
            entity_id,
            name: name.into(),
            role,
            authority,
            capabilities: Vec::new(),
            preferences: PartyPreferences::default(),
            constraints: PartyConstraints::default(),
            reputation_modifiers: BTreeMap::new(),
            mandates: Vec::new(),
        };
        party.validate()?;
        Ok(party)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if self.role == PartyRole::Observer && self.authority != AuthorityLevel::Observer {
            return Err(ValidationError::invariant(
                "party.observer_authority",
                format!("observer role cannot hold {:?} authority", self.authority),
            ));
        }
        let mut seen = BTreeSet::new();
        for capability in &self.capabilities {
            if capability.name.trim().is_empty() {
                return Err(ValidationError::empty_field("capability.name"));
            }
            if capability.domain.trim().is_empty() {
                return Err(ValidationError::empty_field("capability.domain"));
            }
            if !seen.insert(capability.name.to_lowercase()) {
                return Err(ValidationError::invariant(
                    "party.capabilities",
                    format!("duplicate capability '{}'", capability.name),
                ));
            }
        }
        for (source, value) in &self.reputation_modifiers {
            if !(-100..=100).contains(value) {
                return Err(ValidationError::out_of_range(
                    format!("reputation_modifiers.{}", source),
                    -100,
                    100,
                    *value as i64,
                ));
            }
        }
        self.preferences.validate()?;
        self.constraints.validate()
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Result<Self, ValidationError> {
        self.capabilities = capabilities;
        self.validate()?;
        Ok(self)
    }

    pub fn with_preferences(mut self, preferences: PartyPreferences) -> Result<Self, ValidationError> {
        self.preferences = preferences;
        self.validate()?;
        Ok(self)
    }

    pub fn with_constraints(mut self, constraints: PartyConstraints) -> Result<Self, ValidationError> {
        self.constraints = constraints;
        self.validate()?;
        Ok(self)
    }

    pub fn with_reputation_modifier(mut self, source: impl Into<String>, value: i32) -> Result<Self, ValidationError> {
        self.reputation_modifiers.insert(source.into(), value);
        self.validate()?;
        Ok(self)
    }

    pub fn with_mandate(mut self, mandate: Mandate) -> Self {
        self.mandates.push(mandate);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> PartyId {
        self.id
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> PartyRole {
        self.role
    }

    pub fn authority(&self) -> AuthorityLevel {
        self.authority
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn preferences(&self) -> &PartyPreferences {
        &self.preferences
    }

    pub fn constraints(&self) -> &PartyConstraints {
        &self.constraints
    }

    pub fn reputation_modifiers(&self) -> &BTreeMap<String, i32> {
        &self.reputation_modifiers
    }

    pub fn mandates(&self) -> &[Mandate] {
        &self.mandates
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Predicates and derived values
    // ─────────────────────────────────────────────────────────────────────────

    /// True when the party's authority can bind its entity.
    pub fn can_make_binding_decisions(&self) -> bool {
        self.authority.can_bind()
    }

    /// Decision role combined with binding authority.
    pub fn is_decision_maker(&self) -> bool {
        self.role.is_decision_role() && self.can_make_binding_decisions()
    }

    /// Executive authority covers everything; otherwise an unexpired mandate
    /// for the term category is required.
    pub fn has_authority_over(&self, term_category: &str, now: Timestamp) -> bool {
        self.authority == AuthorityLevel::Executive
            || self.mandates.iter().any(|m| m.covers(term_category, now))
    }

    /// Expertise in [0, 1] for a domain; mean over all capabilities when no
    /// domain is given, neutral 0.5 when nothing applies.
    pub fn expertise_in(&self, domain: Option<&str>) -> f64 {
        let relevant: Vec<f64> = match domain {
            Some(d) => self
                .capabilities
                .iter()
                .filter(|c| c.matches_domain(d))
                .map(|c| c.expertise.as_fraction())
                .collect(),
            None => self.capabilities.iter().map(|c| c.expertise.as_fraction()).collect(),
        };
        match domain {
            Some(_) if !relevant.is_empty() => relevant.iter().cloned().fold(0.0, f64::max),
            None if !relevant.is_empty() => relevant.iter().sum::<f64>() / relevant.len() as f64,
            _ => 0.5,
        }
    }

    /// Reputation in [0, 100]; 50 without modifiers.
    pub fn reputation(&self) -> Score {
        if self.reputation_modifiers.is_empty() {
            return Score::NEUTRAL;
        }
        let sum: i32 = self.reputation_modifiers.values().sum();
        let mean = sum as f64 / self.reputation_modifiers.len() as f64;
        Score::new(50.0 + mean / 2.0)
    }

    /// Negotiating power in [0, 100]: authority, expertise and reputation.
    pub fn power_score(&self, domain: Option<&str>) -> Score {
        Score::new(
            50.0 * self.authority.weight()
                + 30.0 * self.expertise_in(domain)
                + 20.0 * self.reputation().as_fraction(),
        )
    }

    /// Symmetric pre-join compatibility check.
    ///
    /// Fails on no shared language, less than one hour of common
    /// availability, two observer-authority parties, or a blocking
    /// negotiation-style pair.
    pub fn is_compatible_with(&self, other: &Party) -> bool {
        self.incompatibility_with(other).is_none()
    }

    /// The first reason two parties cannot share a session, if any.
    pub fn incompatibility_with(&self, other: &Party) -> Option<&'static str> {
        if !self.preferences.shares_language_with(&other.preferences) {
            return Some("no shared language");
        }
        if self.preferences.time.overlap_hours(&other.preferences.time) < 1 {
            return Some("no overlapping availability");
        }
        if self.authority == AuthorityLevel::Observer && other.authority == AuthorityLevel::Observer {
            return Some("both parties are observers");
        }
        if self
            .preferences
            .negotiation_style
            .blocks(other.preferences.negotiation_style)
        {
            return Some("incompatible negotiation styles");
        }
        None
    }
}
