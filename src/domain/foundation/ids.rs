//! Strongly-typed identifier value objects.
//!
//! UUID-backed identifiers accept both the canonical dashed form and the
//! compact 32-hex form, case-insensitively.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Declares a UUID-backed identifier with the standard constructor set.
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the compact 32-hex form (no dashes, lowercase).
            pub fn to_compact(&self) -> String {
                self.0.simple().to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_uuid(s, $field).map(Self)
            }
        }
    };
}

/// Parses a dashed or compact UUID, case-insensitively.
fn parse_uuid(s: &str, field: &str) -> Result<Uuid, ValidationError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    let is_compact = trimmed.len() == 32 && trimmed.chars().all(|c| c.is_ascii_hexdigit());
    let is_dashed = trimmed.len() == 36;
    if !is_compact && !is_dashed {
        return Err(ValidationError::invalid_format(
            field,
            "expected 32 hex digits or the dashed UUID form",
        ));
    }
    Uuid::parse_str(trimmed).map_err(|e| ValidationError::invalid_format(field, e.to_string()))
}

uuid_identifier!(
    /// Unique identifier for a negotiation session.
    SessionId,
    "session_id"
);

uuid_identifier!(
    /// Unique identifier for a party within a negotiation.
    PartyId,
    "party_id"
);

uuid_identifier!(
    /// Unique identifier for a proposal.
    ProposalId,
    "proposal_id"
);

uuid_identifier!(
    /// Unique identifier for a proposal response.
    ResponseId,
    "response_id"
);

/// Declares a non-empty string identifier.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning error if empty.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(id))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

string_identifier!(
    /// Identifier of a single term inside a proposal.
    TermId,
    "term_id"
);

string_identifier!(
    /// Identifier of the real-world entity (person, organisation, agent) behind a party.
    EntityId,
    "entity_id"
);

string_identifier!(
    /// Identifier of whoever issues a command (user, service, scheduler).
    ActorId,
    "actor_id"
);
