//! Feed ranking: factor scoring and probabilistic sampling.

pub mod feed;
pub mod sampler;
pub mod scorer;

pub use feed::{FeedOrchestrator, FeedPage, FeedRequest, FeedStats, MAX_PAGE_SIZE};
pub use sampler::{ProbabilityCloudSampler, SampleResult, SamplerConfig};
pub use scorer::ScoreComputer;
