//! Application configuration module
//!
//! Type-safe configuration loaded with the `config` and `dotenvy` crates.
//! Environment variables use the `PARLEY` prefix and nested values are
//! separated by double underscores. Every section has defaults, so an empty
//! environment yields a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use parley::config::{init_tracing, AppConfig};
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! init_tracing(&config.telemetry).expect("Failed to install tracing");
//! ```

mod analysis;
mod error;
mod monitoring;
mod negotiation;
mod telemetry;

pub use analysis::AnalysisConfig;
pub use error::{ConfigError, ValidationError};
pub use monitoring::MonitoringConfig;
pub use negotiation::NegotiationConfig;
pub use telemetry::{init_tracing, TelemetryConfig};

use serde::Deserialize;
use std::path::Path;

use crate::domain::analysis::AnalysisSettings;
use crate::domain::negotiation::SessionConfiguration;

const ENV_PREFIX: &str = "PARLEY";

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Defaults for new sessions
    #[serde(default)]
    pub negotiation: NegotiationConfig,

    /// Compatibility weights and viability thresholds
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Attention window and inactivity thresholds
    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Log level and format
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PARLEY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `PARLEY__NEGOTIATION__MAX_PARTIES=6` -> `negotiation.max_parties = 6`
    /// - `PARLEY__TELEMETRY__JSON=true` -> `telemetry.json = true`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load a TOML, YAML or JSON file, with the environment layered on top.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.negotiation.validate()?;
        self.analysis.validate()?;
        self.monitoring.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }

    /// Session configuration used when a create command carries none.
    pub fn session_defaults(&self) -> SessionConfiguration {
        self.negotiation.session_configuration()
    }

    /// Settings for the analysis service, including monitoring thresholds.
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            compatibility: self.analysis.compatibility,
            viability: self.analysis.viability,
            health: self.monitoring.health_thresholds(),
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .prefix(ENV_PREFIX)
        .separator("__")
}
