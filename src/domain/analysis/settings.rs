//! Tunable weights and thresholds for the analysis services.

use serde::{Deserialize, Serialize};

/// Relative weight of each compatibility factor. The weights sum to 1.0 so
/// a compatibility score stays within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilityWeights {
    pub authority: f64,
    pub communication_style: f64,
    pub negotiation_style: f64,
    pub expertise: f64,
    pub time: f64,
}

impl Default for CompatibilityWeights {
    fn default() -> Self {
        Self {
            authority: 0.30,
            communication_style: 0.25,
            negotiation_style: 0.20,
            expertise: 0.15,
            time: 0.10,
        }
    }
}

impl CompatibilityWeights {
    pub fn total(&self) -> f64 {
        self.authority + self.communication_style + self.negotiation_style + self.expertise + self.time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViabilityThresholds {
    /// Party scores below this are reported as risks.
    pub risk_below: f64,
    /// Party scores at or above this are reported as success factors.
    pub success_at: f64,
    /// More critical terms than this derate acceptance probability.
    pub max_critical_terms: usize,
    pub expired_factor: f64,
    pub critical_overload_factor: f64,
}

impl Default for ViabilityThresholds {
    fn default() -> Self {
        Self {
            risk_below: 40.0,
            success_at: 70.0,
            max_critical_terms: 5,
            expired_factor: 0.1,
            critical_overload_factor: 0.8,
        }
    }
}

/// Inactivity thresholds used by health scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Idle longer than this costs 10 points.
    pub idle_hours: f64,
    /// Idle longer than this costs 20 points.
    pub inactive_hours: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            idle_hours: 4.0,
            inactive_hours: 24.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub compatibility: CompatibilityWeights,
    pub viability: ViabilityThresholds,
    pub health: HealthThresholds,
}
