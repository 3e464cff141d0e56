//! ProposalResponse value object - a party's answer to a proposal.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::domain::foundation::{PartyId, ProposalId, ResponseId, TermId, Timestamp, ValidationError};

/// Overall answer to a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    Accept,
    Reject,
    ConditionalAccept,
    CounterPropose,
    RequestClarification,
    Abstain,
}

impl ResponseType {
    /// Acceptance weight used by momentum: 1 for accept, 0.5 for
    /// conditional accept, 0 otherwise.
    pub fn acceptance_weight(&self) -> f64 {
        match self {
            ResponseType::Accept => 1.0,
            ResponseType::ConditionalAccept => 0.5,
            _ => 0.0,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResponseType::Accept => "ACCEPT",
            ResponseType::Reject => "REJECT",
            ResponseType::ConditionalAccept => "CONDITIONAL_ACCEPT",
            ResponseType::CounterPropose => "COUNTER_PROPOSE",
            ResponseType::RequestClarification => "REQUEST_CLARIFICATION",
            ResponseType::Abstain => "ABSTAIN",
        };
        write!(f, "{}", s)
    }
}

/// Answer to a single term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TermResponseType {
    Accept,
    Reject,
    Modify,
    Conditional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermResponse {
    pub term_id: TermId,
    pub response: TermResponseType,
    pub modification: Option<serde_json::Value>,
    pub comment: Option<String>,
}

impl TermResponse {
    pub fn new(term_id: TermId, response: TermResponseType) -> Self {
        Self {
            term_id,
            response,
            modification: None,
            comment: None,
        }
    }

    pub fn accept(term_id: TermId) -> Self {
        Self::new(term_id, TermResponseType::Accept)
    }

    pub fn reject(term_id: TermId) -> Self {
        Self::new(term_id, TermResponseType::Reject)
    }

    pub fn with_modification(mut self, value: serde_json::Value) -> Self {
        self.modification = Some(value);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A party's response to one proposal.
///
/// # Invariants
///
/// - term-response ids are unique
/// - `Accept` requires every term response to be `Accept`
/// - `ConditionalAccept` requires at least one condition
/// - `Reject` requires a rejected term or a reason
/// - confidence lies in [0, 1]
/// - `expires_at`, when present, is after `timestamp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProposalResponseRecord")]
pub struct ProposalResponse {
    id: ResponseId,
    proposal_id: ProposalId,
    responder: PartyId,
    response: ResponseType,
    term_responses: Vec<TermResponse>,
    reason: Option<String>,
    comments: Option<String>,
    confidence: f64,
    timestamp: Timestamp,
    expires_at: Option<Timestamp>,
    conditions: Vec<String>,
}

#[derive(Deserialize)]
struct ProposalResponseRecord {
    id: ResponseId,
    proposal_id: ProposalId,
    responder: PartyId,
    response: ResponseType,
    #[serde(default)]
    term_responses: Vec<TermResponse>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    comments: Option<String>,
    confidence: f64,
    timestamp: Timestamp,
    #[serde(default)]
    expires_at: Option<Timestamp>,
    #[serde(default)]
    conditions: Vec<String>,
}

impl TryFrom<ProposalResponseRecord> for ProposalResponse {
    type Error = ValidationError;

    fn try_from(record: ProposalResponseRecord) -> Result<Self, Self::Error> {
        let response = Self {
            id: record.id,
            proposal_id: record.proposal_id,
            responder: record.responder,
            response: record.response,
            term_responses: record.term_responses,
            reason: record.reason,
            comments: record.comments,
            confidence: record.confidence,
            timestamp: record.timestamp,
            expires_at: record.expires_at,
            conditions: record.conditions,
        };
        response.validate()?;
        Ok(response)
    }
}

impl ProposalResponse {
    /// Starts a response with full confidence and no detail.
    pub fn builder(
        proposal_id: ProposalId,
        responder: PartyId,
        response: ResponseType,
        timestamp: Timestamp,
    ) -> ProposalResponseBuilder {
        ProposalResponseBuilder {
            inner: Self {
                id: ResponseId::new(),
                proposal_id,
                responder,
                response,
                term_responses: Vec::new(),
                reason: None,
                comments: None,
                confidence: 1.0,
                timestamp,
                expires_at: None,
                conditions: Vec::new(),
            },
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for tr in &self.term_responses {
            if !seen.insert(&tr.term_id) {
                return Err(ValidationError::invariant(
                    "response.term_ids",
                    format!("duplicate response for term '{}'", tr.term_id),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::invariant(
                "response.confidence",
                format!("confidence {} outside [0, 1]", self.confidence),
            ));
        }
        match self.response {
            ResponseType::Accept => {
                if let Some(tr) = self
                    .term_responses
                    .iter()
                    .find(|tr| tr.response != TermResponseType::Accept)
                {
                    return Err(ValidationError::invariant(
                        "response.consistency",
                        format!("ACCEPT with non-accepted term '{}'", tr.term_id),
                    ));
                }
            }
            ResponseType::ConditionalAccept => {
                if self.conditions.is_empty() {
                    return Err(ValidationError::invariant(
                        "response.consistency",
                        "CONDITIONAL_ACCEPT requires at least one condition",
                    ));
                }
            }
            ResponseType::Reject => {
                let has_rejected_term = self
                    .term_responses
                    .iter()
                    .any(|tr| tr.response == TermResponseType::Reject);
                let has_reason = self.reason.as_deref().map(|r| !r.trim().is_empty()).unwrap_or(false);
                if !has_rejected_term && !has_reason {
                    return Err(ValidationError::invariant(
                        "response.consistency",
                        "REJECT requires a rejected term or a reason",
                    ));
                }
            }
            _ => {}
        }
        if let Some(expires_at) = self.expires_at {
            if !expires_at.is_after(&self.timestamp) {
                return Err(ValidationError::invariant(
                    "response.expires_at",
                    "expiry must be after the response timestamp",
                ));
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> ResponseId {
        self.id
    }

    pub fn proposal_id(&self) -> ProposalId {
        self.proposal_id
    }

    pub fn responder(&self) -> PartyId {
        self.responder
    }

    pub fn response(&self) -> ResponseType {
        self.response
    }

    pub fn term_responses(&self) -> &[TermResponse] {
        &self.term_responses
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Accept with no term left unaccepted.
    ///
    /// Terms of the proposal that the response does not list are treated as
    /// implicitly accepted, so a bare `Accept` with no term responses counts.
    pub fn is_complete_acceptance(&self) -> bool {
        self.response == ResponseType::Accept
            && self
                .term_responses
                .iter()
                .all(|tr| tr.response == TermResponseType::Accept)
    }

    /// True when the response carries comments or term modifications.
    pub fn is_rich(&self) -> bool {
        self.comments.as_deref().map(|c| !c.trim().is_empty()).unwrap_or(false)
            || self
                .term_responses
                .iter()
                .any(|tr| tr.modification.is_some() || tr.comment.is_some())
    }
}

/// Builder for [`ProposalResponse`]; `build` validates.
#[derive(Debug, Clone)]
pub struct ProposalResponseBuilder {
    inner: ProposalResponse,
}

impl ProposalResponseBuilder {
    pub fn id(mut self, id: ResponseId) -> Self {
        self.inner.id = id;
        self
    }

    pub fn term_response(mut self, term_response: TermResponse) -> Self {
        self.inner.term_responses.push(term_response);
        self
    }

    pub fn term_responses(mut self, term_responses: impl IntoIterator<Item = TermResponse>) -> Self {
        self.inner.term_responses.extend(term_responses);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.inner.reason = Some(reason.into());
        self
    }

    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.inner.comments = Some(comments.into());
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.inner.confidence = confidence;
        self
    }

    pub fn expires_at(mut self, at: Timestamp) -> Self {
        self.inner.expires_at = Some(at);
        self
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.inner.conditions.push(condition.into());
        self
    }

    pub fn build(self) -> Result<ProposalResponse, ValidationError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
