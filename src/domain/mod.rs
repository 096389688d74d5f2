pub mod appeal;
pub mod ledger;
pub mod post;
pub mod reputation;
pub mod risk;
pub mod scored;
pub mod weights;

pub use appeal::{AppealOutcome, AppealRecord, AppealStage, AppealStatus};
pub use ledger::{AppendOutcome, EventDraft};
pub use post::{CandidateBounds, CandidatePost, Post, UserContext};
pub use reputation::{
    DAILY_REWARD_CAP, EventType, Reason, ReputationEvent, ReputationScore, STARTING_SCORE, Tier,
};
pub use risk::{IssueTag, RiskReport};
pub use scored::ScoredCandidate;
pub use weights::WeightConfig;
