//! Per-session negotiation rules.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Rules a session is created with. Immutable for the life of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub max_parties: usize,
    pub timeout_hours: u32,
    /// Width of the window before `expected_completion_at` in which a
    /// single timeout warning is emitted.
    pub timeout_warning_hours: u32,
    pub auto_advance: bool,
    pub require_unanimous: bool,
    pub allow_partial_agreement: bool,
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            max_parties: 10,
            timeout_hours: 72,
            timeout_warning_hours: 6,
            auto_advance: true,
            require_unanimous: false,
            allow_partial_agreement: true,
        }
    }
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_parties < 2 {
            return Err(ValidationError::out_of_range(
                "max_parties",
                2,
                i64::MAX,
                self.max_parties as i64,
            ));
        }
        if self.timeout_hours == 0 {
            return Err(ValidationError::out_of_range(
                "timeout_hours",
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        if self.timeout_warning_hours >= self.timeout_hours {
            return Err(ValidationError::out_of_range(
                "timeout_warning_hours",
                0,
                i64::from(self.timeout_hours) - 1,
                i64::from(self.timeout_warning_hours),
            ));
        }
        Ok(())
    }

    pub fn with_max_parties(mut self, max_parties: usize) -> Self {
        self.max_parties = max_parties;
        self
    }

    pub fn with_timeout_hours(mut self, hours: u32) -> Self {
        self.timeout_hours = hours;
        self
    }

    pub fn with_timeout_warning_hours(mut self, hours: u32) -> Self {
        self.timeout_warning_hours = hours;
        self
    }

    pub fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.auto_advance = auto_advance;
        self
    }

    pub fn unanimous(mut self, require_unanimous: bool) -> Self {
        self.require_unanimous = require_unanimous;
        self
    }

    pub fn with_partial_agreement(mut self, allow: bool) -> Self {
        self.allow_partial_agreement = allow;
        self
    }
}
