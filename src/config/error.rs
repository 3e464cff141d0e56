//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Tracing initialisation failed: {0}")]
    Telemetry(String),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("max_parties must be at least 2, got {0}")]
    TooFewParties(usize),

    #[error("timeout_hours must be positive")]
    ZeroTimeout,

    #[error("timeout_warning_hours ({warning}) must be below timeout_hours ({timeout})")]
    WarningNotBeforeTimeout { warning: u32, timeout: u32 },

    #[error("Compatibility weights must sum to 1.0, got {0:.3}")]
    WeightsDoNotSumToOne(f64),

    #[error("{field} must lie in [0, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        max: f64,
        value: f64,
    },

    #[error("idle_hours ({idle}) must not exceed inactive_hours ({inactive})")]
    IdleAfterInactive { idle: f64, inactive: f64 },

    #[error("attention_window_hours must be positive")]
    ZeroAttentionWindow,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
