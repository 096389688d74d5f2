//! Reputation side of the engine: the ledger and everything that writes to it.

pub mod appeals;
pub mod ledger;
pub mod penalty;
pub mod rate_limit;
pub mod risk;
pub mod sweeper;

pub use appeals::{AppealsConfig, AppealsProcessor};
pub use ledger::{HistoryPage, LedgerStats, ReputationLedger, ReputationSummary};
pub use penalty::{CommunityReport, PenaltyEngine, ReportOutcome, ReportStatus};
pub use rate_limit::RateLimiter;
pub use risk::{AnalyzerConfig, ContentRiskAnalyzer};
pub use sweeper::RewardWindowSweeper;
