//! Negotiation command and query handlers.
//!
//! Every command handler follows the same unit of work: load the session,
//! capture its version, apply one aggregate operation at the command's
//! `issued_at`, then save against the captured version and publish the
//! buffered events.

mod analysis;
mod batch;
mod create_session;
mod lifecycle;
mod parties;
mod proposals;
mod queries;
mod support;
mod timeout_sweep;

pub use analysis::{
    AnalyzeCompatibilityQuery, AnalyzeProposalQuery, CalculateMomentumCommand,
    ConflictDetectionResult, DetectConflictsCommand, MomentumResult, RecommendStrategyQuery,
    SessionAnalysisHandler,
};
pub use batch::{BatchCommand, BatchCommandHandler, BatchItemResult, BatchResult, SessionCommand};
pub use create_session::{CreateSessionCommand, CreateSessionHandler};
pub use lifecycle::{
    AdvancePhaseCommand, AdvancePhaseHandler, CheckTimeoutCommand, CheckTimeoutHandler,
    CheckTimeoutResult, TerminateCommand, TerminateHandler,
};
pub use parties::{
    AddPartyCommand, AddPartyHandler, RemovePartyCommand, RemovePartyHandler,
    UpdatePartyCapabilitiesCommand, UpdatePartyCapabilitiesHandler,
};
pub use proposals::{
    ExpireProposalsCommand, ExpireProposalsHandler, ExpireProposalsResult, SubmitProposalCommand,
    SubmitProposalHandler, SubmitResponseCommand, SubmitResponseHandler, WithdrawProposalCommand,
    WithdrawProposalHandler,
};
pub use queries::{
    GetSessionHandler, GetSessionQuery, ListSessionsHandler, ListSessionsQuery, SessionList,
    SessionStatisticsHandler, SessionSummary, SessionView, SessionsRequiringAttentionHandler,
    SessionsRequiringAttentionQuery,
};
pub use support::SessionCommandResult;
pub use timeout_sweep::{TimeoutSweepHandler, TimeoutSweepReport};

pub(crate) use analysis::analysis_domain;
pub(crate) use support::{commit, load_session};
