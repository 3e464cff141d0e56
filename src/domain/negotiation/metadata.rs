//! Descriptive session metadata and phase history entries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, ValidationError};

use super::NegotiationPhase;

/// Kind of negotiation being conducted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationType {
    #[default]
    Commercial,
    Employment,
    Partnership,
    Procurement,
    Dispute,
    Diplomatic,
    Other,
}

impl fmt::Display for NegotiationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NegotiationType::Commercial => "COMMERCIAL",
            NegotiationType::Employment => "EMPLOYMENT",
            NegotiationType::Partnership => "PARTNERSHIP",
            NegotiationType::Procurement => "PROCUREMENT",
            NegotiationType::Dispute => "DISPUTE",
            NegotiationType::Diplomatic => "DIPLOMATIC",
            NegotiationType::Other => "OTHER",
        };
        write!(f, "{}", s)
    }
}

/// What the negotiation is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub title: String,
    pub description: Option<String>,
    /// Subject area, used as the default analysis domain.
    pub domain: Option<String>,
    pub negotiation_type: NegotiationType,
}

impl SessionMetadata {
    pub fn new(title: impl Into<String>, negotiation_type: NegotiationType) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        Ok(Self {
            title,
            description: None,
            domain: None,
            negotiation_type,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// One entry in the append-only phase history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub from: NegotiationPhase,
    pub to: NegotiationPhase,
    pub at: Timestamp,
    pub forced: bool,
}
