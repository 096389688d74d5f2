//! Shared test support utilities
//!
//! Mock collaborators and a fully wired engine over the in-memory adapters,
//! for use in unit and integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::adapter::memory::{
    MemoryAppealRepository, MemoryPostStore, MemoryReputationRepository, MemoryUserStore,
};
use crate::app::{AppState, Collaborators};
use crate::config::Settings;
use crate::domain::{AppendOutcome, EventDraft, Post, ReputationEvent};
use crate::error::RepError;
use crate::port::{
    Classification, LabelScore, ReputationRepository, TextClassifier, UserStanding,
};
use crate::ranking::FeedOrchestrator;
use crate::reputation::{
    AppealsProcessor, ContentRiskAnalyzer, PenaltyEngine, ReputationLedger,
};

/// Classifier driven by substring rules.
///
/// Every rule whose keyword appears in the text (case-insensitive) contributes
/// its labels; text matching no rule comes back with no labels.
#[derive(Default)]
pub struct MockClassifier {
    rules: Vec<(String, Vec<LabelScore>)>,
    unavailable: bool,
    outages: Vec<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, keyword: &str, labels: &[(&str, f64)]) -> Self {
        let labels = labels
            .iter()
            .map(|(label, confidence)| LabelScore {
                label: (*label).to_string(),
                confidence: *confidence,
            })
            .collect();
        self.rules.push((keyword.to_lowercase(), labels));
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Fail any call whose text contains `keyword`.
    pub fn failing_on(mut self, keyword: &str) -> Self {
        self.outages.push(keyword.to_lowercase());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextClassifier for MockClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, RepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(RepError::UpstreamUnavailable("mock classifier down".into()));
        }
        let text = text.to_lowercase();
        if self.outages.iter().any(|keyword| text.contains(keyword.as_str())) {
            return Err(RepError::UpstreamUnavailable("mock classifier outage".into()));
        }
        let labels = self
            .rules
            .iter()
            .filter(|(keyword, _)| text.contains(keyword.as_str()))
            .flat_map(|(_, labels)| labels.iter().cloned())
            .collect();
        Ok(Classification { labels })
    }
}

/// Ledger repository whose first `n` appends fail with a storage error.
pub struct FlakyRepository {
    inner: MemoryReputationRepository,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl FlakyRepository {
    pub async fn with_failures(n: usize) -> (Arc<Self>, Arc<MemoryUserStore>) {
        let repo = Arc::new(Self {
            inner: MemoryReputationRepository::new(),
            failures_left: AtomicUsize::new(n),
            attempts: AtomicUsize::new(0),
        });
        (repo, Arc::new(MemoryUserStore::new()))
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReputationRepository for FlakyRepository {
    async fn append(&self, draft: EventDraft, now: DateTime<Utc>) -> Result<AppendOutcome, RepError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RepError::Storage("injected write failure".into()));
        }
        self.inner.append(draft, now).await
    }

    async fn standing(&self, user_id: Uuid) -> Result<Option<UserStanding>, RepError> {
        self.inner.standing(user_id).await
    }

    async fn standings(&self) -> Result<Vec<UserStanding>, RepError> {
        self.inner.standings().await
    }

    async fn history(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ReputationEvent>, usize), RepError> {
        self.inner.history(user_id, limit, offset).await
    }

    async fn all_events(&self, user_id: Uuid) -> Result<Vec<ReputationEvent>, RepError> {
        self.inner.all_events(user_id).await
    }

    async fn event(&self, event_id: Uuid) -> Result<Option<ReputationEvent>, RepError> {
        self.inner.event(event_id).await
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<ReputationEvent>, RepError> {
        self.inner.events_since(since).await
    }

    async fn prune_reward_windows(&self, before: DateTime<Utc>) -> Result<usize, RepError> {
        self.inner.prune_reward_windows(before).await
    }
}

pub async fn register(users: &Arc<MemoryUserStore>, user_id: Uuid) {
    users.insert(user_id, HashSet::new(), Vec::new()).await;
}

/// In-memory ledger with `n` registered users.
pub async fn ledger_with_users(n: usize) -> (ReputationLedger, Vec<Uuid>) {
    let users = Arc::new(MemoryUserStore::new());
    let mut ids = Vec::with_capacity(n);
    for _ in 0..n {
        let id = Uuid::new_v4();
        register(&users, id).await;
        ids.push(id);
    }
    let ledger = ReputationLedger::new(Arc::new(MemoryReputationRepository::new()), users);
    (ledger, ids)
}

/// Fully wired engine over in-memory collaborators.
pub struct Harness {
    pub state: AppState,
    pub ledger: Arc<ReputationLedger>,
    pub analyzer: Arc<ContentRiskAnalyzer>,
    pub penalties: Arc<PenaltyEngine>,
    pub appeals: Arc<AppealsProcessor>,
    pub feed: Arc<FeedOrchestrator>,
    pub posts: Arc<MemoryPostStore>,
    pub users: Arc<MemoryUserStore>,
}

impl Harness {
    pub async fn new(classifier: MockClassifier) -> Self {
        Self::with_settings(classifier, Settings::default()).await
    }

    pub async fn with_settings(classifier: MockClassifier, settings: Settings) -> Self {
        let posts = Arc::new(MemoryPostStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let state = AppState::new(
            Collaborators {
                posts: posts.clone(),
                users: users.clone(),
                classifier: Arc::new(classifier),
                events: Arc::new(MemoryReputationRepository::new()),
                appeals: Arc::new(MemoryAppealRepository::new()),
            },
            &settings,
        );
        Self {
            ledger: state.ledger.clone(),
            analyzer: state.analyzer.clone(),
            penalties: state.penalties.clone(),
            appeals: state.appeals.clone(),
            feed: state.feed.clone(),
            state,
            posts,
            users,
        }
    }

    /// Register a fresh user and return its id.
    pub async fn user(&self) -> Uuid {
        let id = Uuid::new_v4();
        register(&self.users, id).await;
        id
    }

    /// Publish a post by `author` created now and return its id.
    pub async fn post(&self, author: Uuid, content: &str) -> Uuid {
        let post = Post {
            id: Uuid::new_v4(),
            author_id: author,
            content: content.to_string(),
            engagement_score: 0.0,
            created_at: Utc::now(),
        };
        let id = post.id;
        self.posts.insert(post, None).await;
        id
    }
}
