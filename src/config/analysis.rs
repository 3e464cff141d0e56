//! Analysis weights and thresholds

use serde::Deserialize;

use crate::domain::analysis::{CompatibilityWeights, ViabilityThresholds};

use super::error::ValidationError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub compatibility: CompatibilityWeights,

    #[serde(default)]
    pub viability: ViabilityThresholds,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let w = &self.compatibility;
        for (field, value) in [
            ("compatibility.authority", w.authority),
            ("compatibility.communication_style", w.communication_style),
            ("compatibility.negotiation_style", w.negotiation_style),
            ("compatibility.expertise", w.expertise),
            ("compatibility.time", w.time),
        ] {
            check_range(field, value, 1.0)?;
        }
        let total = w.total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(ValidationError::WeightsDoNotSumToOne(total));
        }

        let v = &self.viability;
        check_range("viability.risk_below", v.risk_below, 100.0)?;
        check_range("viability.success_at", v.success_at, 100.0)?;
        check_range("viability.expired_factor", v.expired_factor, 1.0)?;
        check_range("viability.critical_overload_factor", v.critical_overload_factor, 1.0)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, max: f64) -> Result<(), ValidationError> {
    if (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, max, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_validate() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = AnalysisConfig::default();
        config.compatibility.time = 0.5;
        assert!(matches!(config.validate(), Err(ValidationError::WeightsDoNotSumToOne(_))));
    }

    #[test]
    fn factors_are_fractions() {
        let mut config = AnalysisConfig::default();
        config.viability.expired_factor = 1.5;
        assert_eq!(
            config.validate(),
            Err(ValidationError::OutOfRange {
                field: "viability.expired_factor",
                max: 1.0,
                value: 1.5,
            })
        );
    }
}
