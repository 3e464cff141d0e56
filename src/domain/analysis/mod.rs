//! Analysis module - stateless negotiation analytics.
//!
//! All algorithms hang off [`NegotiationService`], split by concern:
//!
//! - `compatibility` - pairwise party compatibility (0-100)
//! - `viability` - proposal acceptance estimate per decision-maker
//! - `strategy` - approach, phases and tactics from the party mix
//! - `conflicts` - style, authority, response, cultural and timing conflicts
//! - `momentum` - trend, pace and engagement of responses
//! - `optimization` - term relaxations with predicted acceptance delta
//! - `health` - composite session health score
//!
//! Nothing here performs I/O or reads the clock; callers pass `now` in.

mod compatibility;
mod conflicts;
mod health;
mod momentum;
mod optimization;
mod service;
mod settings;
mod strategy;
mod viability;

pub use conflicts::{Conflict, ConflictSeverity, ConflictType};
pub use health::{HealthStatus, SessionHealthReport};
pub use momentum::{MomentumAnalysis, MomentumDirection, Trajectory};
pub use optimization::{
    ImplementationDifficulty, OptimizationReason, TermOptimization, TermOptimizationResult,
};
pub use service::NegotiationService;
pub use settings::{AnalysisSettings, CompatibilityWeights, HealthThresholds, ViabilityThresholds};
pub use strategy::{NegotiationApproach, PartyStrategy, StrategyRecommendation};
pub use viability::{PartyViability, ViabilityAnalysis};
