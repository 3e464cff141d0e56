//! Health monitoring and timeout sweep settings

use serde::Deserialize;

use crate::domain::analysis::HealthThresholds;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Sessions due within this many hours are picked up by the timeout
    /// sweep and the attention query.
    #[serde(default = "default_attention_window_hours")]
    pub attention_window_hours: u32,

    /// Idle longer than this costs 10 health points.
    #[serde(default = "default_idle_hours")]
    pub idle_hours: f64,

    /// Idle longer than this costs 20 health points.
    #[serde(default = "default_inactive_hours")]
    pub inactive_hours: f64,
}

impl MonitoringConfig {
    pub fn health_thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            idle_hours: self.idle_hours,
            inactive_hours: self.inactive_hours,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.attention_window_hours == 0 {
            return Err(ValidationError::ZeroAttentionWindow);
        }
        if self.idle_hours > self.inactive_hours {
            return Err(ValidationError::IdleAfterInactive {
                idle: self.idle_hours,
                inactive: self.inactive_hours,
            });
        }
        Ok(())
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            attention_window_hours: default_attention_window_hours(),
            idle_hours: default_idle_hours(),
            inactive_hours: default_inactive_hours(),
        }
    }
}

fn default_attention_window_hours() -> u32 {
    24
}

fn default_idle_hours() -> f64 {
    4.0
}

fn default_inactive_hours() -> f64 {
    24.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_health_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.health_thresholds(), HealthThresholds::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn idle_cannot_exceed_inactive() {
        let config = MonitoringConfig {
            idle_hours: 48.0,
            ..MonitoringConfig::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::IdleAfterInactive { .. })));
    }
}
