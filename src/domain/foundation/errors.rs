//! Error types for the domain layer.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("Invariant '{rule}' violated: {reason}")]
    Invariant { rule: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a broken-invariant validation error.
    pub fn invariant(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::Invariant {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// Machine-checkable failure category.
///
/// Every [`ErrorCode`] belongs to exactly one kind. Callers branch on the
/// kind; only [`ErrorKind::ConcurrencyConflict`] is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvariantViolation,
    InvalidTransition,
    ConcurrencyConflict,
    Validation,
    Infrastructure,
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    SessionNotFound,
    PartyNotFound,
    ProposalNotFound,
    ResponseNotFound,

    // Invariant violations
    DuplicateParty,
    CapacityExceeded,
    IncompatibleParty,
    MediatorConflict,
    InsufficientParties,
    DuplicateResponse,
    NotAuthorized,
    ProposalExpired,
    WrongPhase,
    SessionInactive,
    PhaseNotReady,
    InsufficientAgreement,

    // State errors
    InvalidStateTransition,

    // Concurrency
    ConcurrencyConflict,

    // Infrastructure errors
    DatabaseError,
    PublishFailed,
    InternalError,
}

impl ErrorCode {
    /// Returns the taxonomy bucket this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        use ErrorCode::*;
        match self {
            ValidationFailed => ErrorKind::Validation,
            SessionNotFound | PartyNotFound | ProposalNotFound | ResponseNotFound => {
                ErrorKind::NotFound
            }
            DuplicateParty | CapacityExceeded | IncompatibleParty | MediatorConflict
            | InsufficientParties | DuplicateResponse | NotAuthorized | ProposalExpired
            | WrongPhase | SessionInactive | PhaseNotReady | InsufficientAgreement => {
                ErrorKind::InvariantViolation
            }
            InvalidStateTransition => ErrorKind::InvalidTransition,
            ConcurrencyConflict => ErrorKind::ConcurrencyConflict,
            DatabaseError | PublishFailed | InternalError => ErrorKind::Infrastructure,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::PartyNotFound => "PARTY_NOT_FOUND",
            ErrorCode::ProposalNotFound => "PROPOSAL_NOT_FOUND",
            ErrorCode::ResponseNotFound => "RESPONSE_NOT_FOUND",
            ErrorCode::DuplicateParty => "DUPLICATE_PARTY",
            ErrorCode::CapacityExceeded => "CAPACITY_EXCEEDED",
            ErrorCode::IncompatibleParty => "INCOMPATIBLE_PARTY",
            ErrorCode::MediatorConflict => "MEDIATOR_CONFLICT",
            ErrorCode::InsufficientParties => "INSUFFICIENT_PARTIES",
            ErrorCode::DuplicateResponse => "DUPLICATE_RESPONSE",
            ErrorCode::NotAuthorized => "NOT_AUTHORIZED",
            ErrorCode::ProposalExpired => "PROPOSAL_EXPIRED",
            ErrorCode::WrongPhase => "WRONG_PHASE",
            ErrorCode::SessionInactive => "SESSION_INACTIVE",
            ErrorCode::PhaseNotReady => "PHASE_NOT_READY",
            ErrorCode::InsufficientAgreement => "INSUFFICIENT_AGREEMENT",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::PublishFailed => "PUBLISH_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field.into())
    }

    /// Creates a not-found error for an entity type and id.
    pub fn not_found(code: ErrorCode, entity: &str, id: impl fmt::Display) -> Self {
        Self::new(code, format!("{} not found: {}", entity, id)).with_detail("id", id.to_string())
    }

    /// Creates an invalid phase transition error.
    pub fn invalid_transition(from: impl fmt::Debug, to: impl fmt::Debug) -> Self {
        Self::new(
            ErrorCode::InvalidStateTransition,
            format!("Cannot transition from {:?} to {:?}", from, to),
        )
    }

    /// Creates an optimistic-locking conflict error.
    pub fn concurrency_conflict(expected: u64, actual: u64) -> Self {
        Self::new(
            ErrorCode::ConcurrencyConflict,
            format!("Version mismatch: expected {}, found {}", expected, actual),
        )
        .with_detail("expected_version", expected.to_string())
        .with_detail("actual_version", actual.to_string())
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Only stale-version conflicts are worth retrying after a re-read.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyConflict
    }
}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::EmptyField { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field.clone(),
            ValidationError::Invariant { rule, .. } => rule.clone(),
        };
        DomainError::validation(field, err.to_string())
    }
}
