use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AppendOutcome, EventDraft, ReputationEvent};
use crate::error::RepError;

/// Cached projection of one user's ledger.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStanding {
    pub user_id: Uuid,
    /// Raw, unclamped sum of all event points.
    pub points_sum: f64,
    pub event_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Storage for the append-only reputation event log.
///
/// `append` must be atomic per user: the dedup check, the reward-cap check,
/// the insert and the cached score update happen in one critical section,
/// using `domain::ledger::plan_append` to decide the outcome.
#[async_trait]
pub trait ReputationRepository: Send + Sync {
    async fn append(&self, draft: EventDraft, now: DateTime<Utc>) -> Result<AppendOutcome, RepError>;

    /// Cached standing, `None` for users with no events yet.
    async fn standing(&self, user_id: Uuid) -> Result<Option<UserStanding>, RepError>;

    async fn standings(&self) -> Result<Vec<UserStanding>, RepError>;

    /// Events newest first, plus the user's total event count.
    async fn history(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ReputationEvent>, usize), RepError>;

    /// Full history oldest first, for audits.
    async fn all_events(&self, user_id: Uuid) -> Result<Vec<ReputationEvent>, RepError>;

    async fn event(&self, event_id: Uuid) -> Result<Option<ReputationEvent>, RepError>;

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<ReputationEvent>, RepError>;

    /// Drop reward-window bookkeeping older than `before`. Returns entries removed.
    async fn prune_reward_windows(&self, before: DateTime<Utc>) -> Result<usize, RepError>;
}
