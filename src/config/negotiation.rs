//! Default rules for new negotiation sessions

use serde::Deserialize;

use crate::domain::negotiation::SessionConfiguration;

use super::error::ValidationError;

/// Session defaults applied when a create command carries no configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NegotiationConfig {
    #[serde(default = "default_max_parties")]
    pub max_parties: usize,

    #[serde(default = "default_timeout_hours")]
    pub timeout_hours: u32,

    #[serde(default = "default_timeout_warning_hours")]
    pub timeout_warning_hours: u32,

    #[serde(default = "default_true")]
    pub auto_advance: bool,

    #[serde(default)]
    pub require_unanimous: bool,

    #[serde(default = "default_true")]
    pub allow_partial_agreement: bool,
}

impl NegotiationConfig {
    pub fn session_configuration(&self) -> SessionConfiguration {
        SessionConfiguration {
            max_parties: self.max_parties,
            timeout_hours: self.timeout_hours,
            timeout_warning_hours: self.timeout_warning_hours,
            auto_advance: self.auto_advance,
            require_unanimous: self.require_unanimous,
            allow_partial_agreement: self.allow_partial_agreement,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_parties < 2 {
            return Err(ValidationError::TooFewParties(self.max_parties));
        }
        if self.timeout_hours == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        if self.timeout_warning_hours >= self.timeout_hours {
            return Err(ValidationError::WarningNotBeforeTimeout {
                warning: self.timeout_warning_hours,
                timeout: self.timeout_hours,
            });
        }
        Ok(())
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_parties: default_max_parties(),
            timeout_hours: default_timeout_hours(),
            timeout_warning_hours: default_timeout_warning_hours(),
            auto_advance: true,
            require_unanimous: false,
            allow_partial_agreement: true,
        }
    }
}

fn default_max_parties() -> usize {
    10
}

fn default_timeout_hours() -> u32 {
    72
}

fn default_timeout_warning_hours() -> u32 {
    6
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_session_defaults() {
        let config = NegotiationConfig::default();
        assert_eq!(config.session_configuration(), SessionConfiguration::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: NegotiationConfig = serde_json::from_str(r#"{"max_parties": 4}"#).unwrap();
        assert_eq!(config.max_parties, 4);
        assert_eq!(config.timeout_hours, 72);
        assert!(config.auto_advance);
    }

    #[test]
    fn warning_must_precede_timeout() {
        let config = NegotiationConfig {
            timeout_hours: 6,
            ..NegotiationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::WarningNotBeforeTimeout { warning: 6, timeout: 6 })
        );
    }

    #[test]
    fn rejects_single_party_sessions() {
        let config = NegotiationConfig {
            max_parties: 1,
            ..NegotiationConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::TooFewParties(1)));
    }
}
