use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapter::classifier::{HttpClassifier, HttpClassifierConfig, UnconfiguredClassifier};
use crate::adapter::json_file::{AppealJournal, EventJournal, SeedData};
use crate::adapter::memory::{
    MemoryAppealRepository, MemoryPostStore, MemoryReputationRepository, MemoryUserStore,
};
use crate::config::Settings;
use crate::domain::CandidateBounds;
use crate::port::{AppealRepository, PostStore, ReputationRepository, TextClassifier, UserStore};
use crate::ranking::{FeedOrchestrator, ProbabilityCloudSampler, SamplerConfig, ScoreComputer};
use crate::reputation::{
    AnalyzerConfig, AppealsConfig, AppealsProcessor, ContentRiskAnalyzer, PenaltyEngine,
    RateLimiter, ReputationLedger, RewardWindowSweeper,
};

/// External collaborators the engine is wired against.
pub struct Collaborators {
    pub posts: Arc<dyn PostStore>,
    pub users: Arc<dyn UserStore>,
    pub classifier: Arc<dyn TextClassifier>,
    pub events: Arc<dyn ReputationRepository>,
    pub appeals: Arc<dyn AppealRepository>,
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<ReputationLedger>,
    pub analyzer: Arc<ContentRiskAnalyzer>,
    pub penalties: Arc<PenaltyEngine>,
    pub appeals: Arc<AppealsProcessor>,
    pub feed: Arc<FeedOrchestrator>,
    pub analyze_limiter: Arc<RateLimiter>,
    pub appeal_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the engine components over the given collaborators.
    #[must_use]
    pub fn new(collaborators: Collaborators, settings: &Settings) -> Self {
        let Collaborators {
            posts,
            users,
            classifier,
            events,
            appeals,
        } = collaborators;

        let ledger = Arc::new(ReputationLedger::new(events, Arc::clone(&users)));
        let analyzer = Arc::new(ContentRiskAnalyzer::new(
            classifier,
            AnalyzerConfig {
                threshold: settings.issue_confidence_threshold,
                timeout: settings.classifier_timeout,
            },
        ));
        let penalties = Arc::new(PenaltyEngine::new(
            Arc::clone(&analyzer),
            Arc::clone(&ledger),
            Arc::clone(&posts),
            Arc::clone(&users),
        ));

        let analyze_limiter = Arc::new(RateLimiter::per_minute(
            settings.analyze_rate_limit_per_minute,
        ));
        let appeal_limiter = Arc::new(RateLimiter::per_day(settings.appeal_rate_limit_per_day));

        let appeals = Arc::new(AppealsProcessor::new(
            appeals,
            Arc::clone(&ledger),
            Arc::clone(&posts),
            Arc::clone(&analyzer),
            Arc::clone(&appeal_limiter),
            AppealsConfig {
                threshold: settings.appeal_confidence_threshold,
            },
        ));

        let feed = Arc::new(FeedOrchestrator::new(
            posts,
            users,
            ScoreComputer::new(Arc::clone(&ledger)),
            ProbabilityCloudSampler::new(SamplerConfig {
                epsilon: settings.sampler_epsilon,
            }),
            CandidateBounds {
                max_candidates: settings.feed_max_candidates,
                max_age_hours: settings.feed_max_age_hours,
            },
        ));

        Self {
            ledger,
            analyzer,
            penalties,
            appeals,
            feed,
            analyze_limiter,
            appeal_limiter,
        }
    }

    /// Create `AppState` from configuration settings.
    ///
    /// Replays the event and appeal journals, loads seed data, picks the
    /// classifier and spawns the reward window sweeper on `shutdown_token`.
    pub async fn from_settings(
        settings: &Settings,
        shutdown_token: CancellationToken,
    ) -> anyhow::Result<Self> {
        let events = match &settings.event_journal_path {
            Some(path) => {
                let (journal, history) = EventJournal::open(path).await?;
                let repo = MemoryReputationRepository::with_journal(journal);
                let restored = repo.restore(history).await;
                info!(path = ?path, restored, "event journal replayed");
                repo
            }
            None => {
                warn!("EVENT_JOURNAL_PATH not set, reputation events are kept in memory only");
                MemoryReputationRepository::new()
            }
        };

        let appeals = match settings.appeal_journal() {
            Some(path) => {
                let (journal, revisions) = AppealJournal::open(&path).await?;
                let repo = MemoryAppealRepository::with_journal(journal);
                let restored = repo.restore(revisions).await;
                info!(path = ?path, restored, "appeal journal replayed");
                repo
            }
            None => MemoryAppealRepository::new(),
        };

        let users = Arc::new(MemoryUserStore::new());
        let posts = Arc::new(MemoryPostStore::new());
        if let Some(path) = &settings.seed_data_path {
            let (user_count, post_count) = SeedData::load(path).await?.apply(&users, &posts).await;
            info!(path = ?path, users = user_count, posts = post_count, "seed data loaded");
        }

        let classifier: Arc<dyn TextClassifier> = match &settings.classifier_url {
            Some(base_url) => Arc::new(
                HttpClassifier::new(HttpClassifierConfig {
                    base_url: base_url.clone(),
                    timeout: settings.classifier_timeout,
                    token: settings.classifier_token.clone(),
                })
                .context("failed to build classifier client")?,
            ),
            None => {
                warn!("CLASSIFIER_URL not set, content analysis will always degrade");
                Arc::new(UnconfiguredClassifier)
            }
        };

        let state = Self::new(
            Collaborators {
                posts,
                users,
                classifier,
                events: Arc::new(events),
                appeals: Arc::new(appeals),
            },
            settings,
        );

        if settings.reward_sweep_interval.is_zero() {
            info!("reward window sweeper disabled");
        } else {
            // The handle is not awaited; the loop exits on the shutdown token.
            let _sweeper = RewardWindowSweeper::new(
                Arc::clone(&state.ledger),
                settings.reward_sweep_interval,
            )
            .with_limiter(Arc::clone(&state.analyze_limiter))
            .with_limiter(Arc::clone(&state.appeal_limiter))
            .spawn(shutdown_token);
        }

        Ok(state)
    }
}
