use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    AppendOutcome, EventDraft, EventType, Reason, ReputationEvent, ReputationScore, Tier,
};
use crate::error::RepError;
use crate::port::{ReputationRepository, UserStanding, UserStore};

/// Public view of a user's reputation.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReputationSummary {
    pub user_id: Uuid,
    pub score: u8,
    pub tier: Tier,
    pub visibility_multiplier: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ReputationSummary {
    fn from_standing(user_id: Uuid, standing: Option<&UserStanding>) -> Self {
        let score = standing
            .map(|s| ReputationScore::from_points_sum(s.points_sum))
            .unwrap_or_default();
        let tier = score.tier();
        Self {
            user_id,
            score: score.as_int(),
            tier,
            visibility_multiplier: tier.multiplier(),
            last_updated: standing.and_then(|s| s.last_updated),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub events: Vec<ReputationEvent>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TierDistribution {
    pub trusted: usize,
    pub standard: usize,
    pub limited: usize,
    pub restricted: usize,
}

impl TierDistribution {
    fn add(&mut self, tier: Tier) {
        match tier {
            Tier::Trusted => self.trusted += 1,
            Tier::Standard => self.standard += 1,
            Tier::Limited => self.limited += 1,
            Tier::Restricted => self.restricted += 1,
        }
    }
}

/// Aggregate numbers for the admin stats endpoint.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub tracked_users: usize,
    pub average_score: f64,
    pub tiers: TierDistribution,
    pub penalties_last_24h: usize,
    pub rewards_last_24h: usize,
    pub penalty_points_last_24h: f64,
    pub reward_points_last_24h: f64,
}

/// Note token tying an `appeal_overturned` reward to the penalty it reverses.
#[must_use]
pub fn compensation_marker(event_id: Uuid) -> String {
    format!("event:{event_id}")
}

/// Append-only reputation ledger.
///
/// Caps and dedup are enforced by the repository inside its per-user critical
/// section; this type validates drafts, checks users exist, and retries a
/// failed write once before giving up.
pub struct ReputationLedger {
    repo: Arc<dyn ReputationRepository>,
    users: Arc<dyn UserStore>,
}

impl ReputationLedger {
    pub fn new(repo: Arc<dyn ReputationRepository>, users: Arc<dyn UserStore>) -> Self {
        Self { repo, users }
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), RepError> {
        if self.users.exists(user_id).await? {
            Ok(())
        } else {
            Err(RepError::UnknownUser(user_id))
        }
    }

    /// Current score from the cached running total.
    pub async fn current_score(&self, user_id: Uuid) -> Result<ReputationScore, RepError> {
        self.ensure_user(user_id).await?;
        Ok(self
            .repo
            .standing(user_id)
            .await?
            .map(|s| ReputationScore::from_points_sum(s.points_sum))
            .unwrap_or_default())
    }

    /// Score re-derived from the full event history.
    pub async fn audit_score(&self, user_id: Uuid) -> Result<ReputationScore, RepError> {
        self.ensure_user(user_id).await?;
        let events = self.repo.all_events(user_id).await?;
        Ok(ReputationScore::from_points_sum(
            events.iter().map(|e| e.points).sum(),
        ))
    }

    pub async fn summary(&self, user_id: Uuid) -> Result<ReputationSummary, RepError> {
        self.ensure_user(user_id).await?;
        let standing = self.repo.standing(user_id).await?;
        Ok(ReputationSummary::from_standing(user_id, standing.as_ref()))
    }

    pub async fn append_event(
        &self,
        user_id: Uuid,
        event_type: EventType,
        reason: Reason,
        points: f64,
        post_id: Option<Uuid>,
    ) -> Result<AppendOutcome, RepError> {
        self.append(EventDraft {
            user_id,
            event_type,
            reason,
            points,
            post_id,
            validated: true,
            note: None,
        })
        .await
    }

    pub async fn append(&self, draft: EventDraft) -> Result<AppendOutcome, RepError> {
        self.append_at(draft, Utc::now()).await
    }

    pub async fn append_at(
        &self,
        draft: EventDraft,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, RepError> {
        validate_draft(&draft)?;
        self.ensure_user(draft.user_id).await?;

        let outcome = match self.repo.append(draft.clone(), now).await {
            Err(RepError::Storage(reason)) => {
                warn!(user_id = %draft.user_id, %reason, "ledger write failed, retrying once");
                self.repo.append(draft.clone(), now).await?
            }
            other => other?,
        };

        match &outcome {
            AppendOutcome::Recorded { event } => info!(
                user_id = %event.user_id,
                event_id = %event.id,
                reason = %event.reason,
                points = event.points,
                score_after = event.score_after,
                "reputation event recorded"
            ),
            AppendOutcome::Truncated { event, requested } => info!(
                user_id = %event.user_id,
                event_id = %event.id,
                reason = %event.reason,
                points = event.points,
                requested,
                "reward truncated by daily cap"
            ),
            AppendOutcome::Existing { event } => info!(
                user_id = %event.user_id,
                event_id = %event.id,
                "penalty for post already recorded"
            ),
            AppendOutcome::Dropped { requested } => info!(
                user_id = %draft.user_id,
                reason = %draft.reason,
                requested,
                "reward dropped, daily cap reached"
            ),
        }
        Ok(outcome)
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<HistoryPage, RepError> {
        self.ensure_user(user_id).await?;
        let (events, total) = self.repo.history(user_id, limit, offset).await?;
        Ok(HistoryPage {
            events,
            total,
            limit,
            offset,
        })
    }

    pub async fn event(&self, event_id: Uuid) -> Result<ReputationEvent, RepError> {
        self.repo
            .event(event_id)
            .await?
            .ok_or_else(|| RepError::not_found("Reputation event", event_id))
    }

    /// The appeal compensation already paid out for `event`, if any.
    pub async fn compensation_for(
        &self,
        event: &ReputationEvent,
    ) -> Result<Option<ReputationEvent>, RepError> {
        let marker = compensation_marker(event.id);
        Ok(self
            .repo
            .all_events(event.user_id)
            .await?
            .into_iter()
            .find(|e| {
                e.reason == Reason::AppealOverturned
                    && e.note
                        .as_deref()
                        .is_some_and(|note| note.split_whitespace().any(|part| part == marker))
            }))
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<LedgerStats, RepError> {
        let standings = self.repo.standings().await?;
        let mut stats = LedgerStats {
            tracked_users: standings.len(),
            ..LedgerStats::default()
        };
        let mut total = 0.0;
        for standing in &standings {
            let score = ReputationScore::from_points_sum(standing.points_sum);
            total += score.value();
            stats.tiers.add(score.tier());
        }
        if !standings.is_empty() {
            stats.average_score = total / standings.len() as f64;
        }

        for event in self.repo.events_since(now - Duration::hours(24)).await? {
            match event.event_type {
                EventType::Penalty => {
                    stats.penalties_last_24h += 1;
                    stats.penalty_points_last_24h += event.points;
                }
                EventType::Reward => {
                    stats.rewards_last_24h += 1;
                    stats.reward_points_last_24h += event.points;
                }
            }
        }
        Ok(stats)
    }

    /// Users whose score is below `threshold`, lowest first.
    pub async fn low_reputation(
        &self,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<ReputationSummary>, RepError> {
        let mut low: Vec<(f64, ReputationSummary)> = self
            .repo
            .standings()
            .await?
            .iter()
            .filter_map(|standing| {
                let score = ReputationScore::from_points_sum(standing.points_sum).value();
                (score < threshold).then(|| {
                    (
                        score,
                        ReputationSummary::from_standing(standing.user_id, Some(standing)),
                    )
                })
            })
            .collect();
        low.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(low.into_iter().take(limit).map(|(_, s)| s).collect())
    }

    pub async fn prune_reward_windows(&self, now: DateTime<Utc>) -> Result<usize, RepError> {
        self.repo
            .prune_reward_windows(now - crate::domain::ledger::reward_window())
            .await
    }
}

fn validate_draft(draft: &EventDraft) -> Result<(), RepError> {
    if draft.reason.event_type() != draft.event_type {
        return Err(RepError::Validation(format!(
            "reason {} is not a {} reason",
            draft.reason,
            draft.event_type.as_str()
        )));
    }
    if !draft.points.is_finite() {
        return Err(RepError::Validation("points must be finite".into()));
    }
    match draft.event_type {
        EventType::Penalty if draft.points >= 0.0 => Err(RepError::Validation(
            "penalty points must be negative".into(),
        )),
        EventType::Reward if draft.points <= 0.0 => Err(RepError::Validation(
            "reward points must be positive".into(),
        )),
        _ => Ok(()),
    }
}
