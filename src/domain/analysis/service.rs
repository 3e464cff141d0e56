//! NegotiationService - stateless negotiation analytics.

use super::AnalysisSettings;

/// Pure analysis functions over parties, proposals and responses.
///
/// Holds only immutable settings. Every method is deterministic given its
/// inputs; the current time is always passed in explicitly. The algorithms
/// live in their own modules as separate `impl` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegotiationService {
    settings: AnalysisSettings,
}

impl NegotiationService {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }
}
