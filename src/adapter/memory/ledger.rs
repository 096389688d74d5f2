use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::adapter::json_file::EventJournal;
use crate::domain::ledger::{
    AppendPlan, UserLedgerState, counts_toward_cap, plan_append, reward_window,
};
use crate::domain::{AppendOutcome, EventDraft, EventType, ReputationEvent};
use crate::error::RepError;
use crate::port::{ReputationRepository, UserStanding};

#[derive(Default)]
struct UserLedger {
    events: Vec<ReputationEvent>,
    points_sum: f64,
    /// post id -> index of its penalty event
    penalty_posts: HashMap<Uuid, usize>,
    /// (created_at, points) of capped rewards still inside some window
    reward_window: VecDeque<(DateTime<Utc>, f64)>,
}

impl UserLedger {
    fn state_for(&self, draft: &EventDraft, now: DateTime<Utc>) -> UserLedgerState {
        let existing_penalty = match (draft.event_type, draft.post_id) {
            (EventType::Penalty, Some(post_id)) => self
                .penalty_posts
                .get(&post_id)
                .and_then(|idx| self.events.get(*idx))
                .cloned(),
            _ => None,
        };
        let window_start = now - reward_window();
        let capped_rewards_in_window = self
            .reward_window
            .iter()
            .filter(|(at, _)| *at > window_start && *at <= now)
            .map(|(_, points)| points)
            .sum();
        UserLedgerState {
            points_sum: self.points_sum,
            existing_penalty,
            capped_rewards_in_window,
        }
    }

    fn push(&mut self, event: ReputationEvent) -> usize {
        let idx = self.events.len();
        self.points_sum += event.points;
        if event.event_type == EventType::Penalty {
            if let Some(post_id) = event.post_id {
                self.penalty_posts.entry(post_id).or_insert(idx);
            }
        }
        if counts_toward_cap(&event) {
            self.reward_window.push_back((event.created_at, event.points));
        }
        self.events.push(event);
        idx
    }

    fn standing(&self, user_id: Uuid) -> UserStanding {
        UserStanding {
            user_id,
            points_sum: self.points_sum,
            event_count: self.events.len(),
            last_updated: self.events.last().map(|e| e.created_at),
        }
    }
}

/// In-process ledger with a per-user async mutex serializing appends.
///
/// When a journal is attached, every new event is written to it before it
/// becomes visible, so the file stays the source of truth.
#[derive(Default)]
pub struct MemoryReputationRepository {
    users: RwLock<HashMap<Uuid, Arc<Mutex<UserLedger>>>>,
    events_by_id: RwLock<HashMap<Uuid, (Uuid, usize)>>,
    journal: Option<EventJournal>,
}

impl MemoryReputationRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_journal(journal: EventJournal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Rebuild the cached projection from a trusted event history (journal replay).
    pub async fn restore(&self, events: Vec<ReputationEvent>) -> usize {
        let mut restored = 0;
        for event in events {
            let user_id = event.user_id;
            let event_id = event.id;
            let ledger = self.ledger_for(user_id).await;
            let idx = ledger.lock().await.push(event);
            self.events_by_id
                .write()
                .await
                .insert(event_id, (user_id, idx));
            restored += 1;
        }
        restored
    }

    async fn ledger_for(&self, user_id: Uuid) -> Arc<Mutex<UserLedger>> {
        if let Some(ledger) = self.users.read().await.get(&user_id) {
            return Arc::clone(ledger);
        }
        let mut users = self.users.write().await;
        Arc::clone(users.entry(user_id).or_default())
    }

    async fn existing_ledger(&self, user_id: Uuid) -> Option<Arc<Mutex<UserLedger>>> {
        self.users.read().await.get(&user_id).map(Arc::clone)
    }
}

#[async_trait]
impl ReputationRepository for MemoryReputationRepository {
    async fn append(&self, draft: EventDraft, now: DateTime<Utc>) -> Result<AppendOutcome, RepError> {
        let ledger = self.ledger_for(draft.user_id).await;
        let mut guard = ledger.lock().await;

        let state = guard.state_for(&draft, now);
        match plan_append(&state, &draft, now) {
            AppendPlan::Existing(event) => {
                debug!(user_id = %draft.user_id, event_id = %event.id, "penalty already recorded for post");
                Ok(AppendOutcome::Existing { event })
            }
            AppendPlan::Drop => Ok(AppendOutcome::Dropped {
                requested: draft.points,
            }),
            AppendPlan::Insert { event, truncated } => {
                if let Some(journal) = &self.journal {
                    journal
                        .append(&event)
                        .await
                        .map_err(|e| RepError::Storage(format!("journal write failed: {e}")))?;
                }
                let idx = guard.push(event.clone());
                self.events_by_id
                    .write()
                    .await
                    .insert(event.id, (event.user_id, idx));
                Ok(if truncated {
                    AppendOutcome::Truncated {
                        event,
                        requested: draft.points,
                    }
                } else {
                    AppendOutcome::Recorded { event }
                })
            }
        }
    }

    async fn standing(&self, user_id: Uuid) -> Result<Option<UserStanding>, RepError> {
        let Some(ledger) = self.existing_ledger(user_id).await else {
            return Ok(None);
        };
        let guard = ledger.lock().await;
        if guard.events.is_empty() {
            return Ok(None);
        }
        Ok(Some(guard.standing(user_id)))
    }

    async fn standings(&self) -> Result<Vec<UserStanding>, RepError> {
        let ledgers: Vec<(Uuid, Arc<Mutex<UserLedger>>)> = self
            .users
            .read()
            .await
            .iter()
            .map(|(id, ledger)| (*id, Arc::clone(ledger)))
            .collect();
        let mut standings = Vec::with_capacity(ledgers.len());
        for (user_id, ledger) in ledgers {
            let guard = ledger.lock().await;
            if !guard.events.is_empty() {
                standings.push(guard.standing(user_id));
            }
        }
        Ok(standings)
    }

    async fn history(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ReputationEvent>, usize), RepError> {
        let Some(ledger) = self.existing_ledger(user_id).await else {
            return Ok((Vec::new(), 0));
        };
        let guard = ledger.lock().await;
        let total = guard.events.len();
        let page = guard
            .events
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn all_events(&self, user_id: Uuid) -> Result<Vec<ReputationEvent>, RepError> {
        match self.existing_ledger(user_id).await {
            Some(ledger) => Ok(ledger.lock().await.events.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn event(&self, event_id: Uuid) -> Result<Option<ReputationEvent>, RepError> {
        let location = self.events_by_id.read().await.get(&event_id).copied();
        let Some((user_id, idx)) = location else {
            return Ok(None);
        };
        match self.existing_ledger(user_id).await {
            Some(ledger) => Ok(ledger.lock().await.events.get(idx).cloned()),
            None => Ok(None),
        }
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<ReputationEvent>, RepError> {
        let ledgers: Vec<Arc<Mutex<UserLedger>>> =
            self.users.read().await.values().map(Arc::clone).collect();
        let mut events = Vec::new();
        for ledger in ledgers {
            let guard = ledger.lock().await;
            events.extend(
                guard
                    .events
                    .iter()
                    .filter(|e| e.created_at >= since)
                    .cloned(),
            );
        }
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn prune_reward_windows(&self, before: DateTime<Utc>) -> Result<usize, RepError> {
        let ledgers: Vec<Arc<Mutex<UserLedger>>> =
            self.users.read().await.values().map(Arc::clone).collect();
        let mut removed = 0;
        for ledger in ledgers {
            let mut guard = ledger.lock().await;
            let len_before = guard.reward_window.len();
            guard.reward_window.retain(|(at, _)| *at > before);
            removed += len_before - guard.reward_window.len();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Reason;
    use chrono::Duration;

    fn draft(user_id: Uuid, reason: Reason, points: f64, post_id: Option<Uuid>) -> EventDraft {
        EventDraft {
            user_id,
            event_type: reason.event_type(),
            reason,
            points,
            post_id,
            validated: true,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_penalty_returns_existing() {
        let repo = MemoryReputationRepository::new();
        let user = Uuid::new_v4();
        let post = Uuid::new_v4();
        let now = Utc::now();

        let first = repo
            .append(draft(user, Reason::Spam, -2.0, Some(post)), now)
            .await
            .unwrap();
        let second = repo
            .append(draft(user, Reason::Harassment, -8.0, Some(post)), now)
            .await
            .unwrap();

        assert!(first.is_new());
        assert!(matches!(second, AppendOutcome::Existing { .. }));
        assert_eq!(first.event().unwrap().id, second.event().unwrap().id);
        assert_eq!(repo.all_events(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scores_chain_between_events() {
        let repo = MemoryReputationRepository::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        repo.append(draft(user, Reason::Spam, -2.0, None), now).await.unwrap();
        repo.append(draft(user, Reason::QualityPost, 0.5, None), now).await.unwrap();
        repo.append(draft(user, Reason::HateSpeech, -10.0, None), now).await.unwrap();

        let events = repo.all_events(user).await.unwrap();
        for pair in events.windows(2) {
            assert_eq!(pair[0].score_after, pair[1].score_before);
        }
        let standing = repo.standing(user).await.unwrap().unwrap();
        assert!((standing.points_sum + 11.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reward_window_rolls() {
        let repo = MemoryReputationRepository::new();
        let user = Uuid::new_v4();
        let start = Utc::now();
        repo.append(draft(user, Reason::QualityPost, 2.0, None), start)
            .await
            .unwrap();
        let capped = repo
            .append(draft(user, Reason::QualityPost, 0.5, None), start + Duration::hours(23))
            .await
            .unwrap();
        assert!(matches!(capped, AppendOutcome::Dropped { .. }));

        let later = repo
            .append(draft(user, Reason::QualityPost, 0.5, None), start + Duration::hours(25))
            .await
            .unwrap();
        assert!(matches!(later, AppendOutcome::Recorded { .. }));
    }

    #[tokio::test]
    async fn test_prune_reward_windows() {
        let repo = MemoryReputationRepository::new();
        let user = Uuid::new_v4();
        let old = Utc::now() - Duration::hours(30);
        repo.append(draft(user, Reason::HelpfulComment, 0.5, None), old)
            .await
            .unwrap();
        repo.append(draft(user, Reason::HelpfulComment, 0.5, None), Utc::now())
            .await
            .unwrap();
        let removed = repo
            .prune_reward_windows(Utc::now() - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_paginated() {
        let repo = MemoryReputationRepository::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        for i in 0..5 {
            repo.append(draft(user, Reason::Spam, -1.0, None), now + Duration::seconds(i))
                .await
                .unwrap();
        }
        let (page, total) = repo.history(user, 2, 1).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert!(page[0].created_at > page[1].created_at);
    }

    #[tokio::test]
    async fn test_event_lookup_by_id() {
        let repo = MemoryReputationRepository::new();
        let user = Uuid::new_v4();
        let outcome = repo
            .append(draft(user, Reason::Spam, -2.0, None), Utc::now())
            .await
            .unwrap();
        let id = outcome.event().unwrap().id;
        assert_eq!(repo.event(id).await.unwrap().unwrap().id, id);
        assert!(repo.event(Uuid::new_v4()).await.unwrap().is_none());
    }
}
