//! Append rules shared by every ledger repository.
//!
//! A repository gathers a [`UserLedgerState`] inside its per-user critical
//! section, asks [`plan_append`] what to do, and then commits the plan. Keeping
//! the rules here means an in-memory store and a SQL store cannot drift apart.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::reputation::{
    DAILY_REWARD_CAP, EventType, Reason, ReputationEvent, ReputationScore,
};

/// Rolling window the daily reward cap applies to.
#[must_use]
pub fn reward_window() -> Duration {
    Duration::hours(24)
}

/// A request to append one event, before caps and dedup are applied.
#[derive(Clone, Debug, PartialEq)]
pub struct EventDraft {
    pub user_id: Uuid,
    pub event_type: EventType,
    pub reason: Reason,
    pub points: f64,
    pub post_id: Option<Uuid>,
    pub validated: bool,
    pub note: Option<String>,
}

/// What the repository knows about a user at the moment of the append.
#[derive(Clone, Debug, Default)]
pub struct UserLedgerState {
    /// Raw, unclamped sum of all event points so far.
    pub points_sum: f64,
    /// Existing penalty for the draft's post, if any.
    pub existing_penalty: Option<ReputationEvent>,
    /// Capped reward points recorded inside the trailing window.
    pub capped_rewards_in_window: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppendPlan {
    /// Penalty already recorded for this post; return it unchanged.
    Existing(ReputationEvent),
    /// Reward has no headroom left under the cap.
    Drop,
    /// Insert the event with these (possibly truncated) points.
    Insert { event: ReputationEvent, truncated: bool },
}

/// Result of an append as seen by callers.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AppendOutcome {
    Recorded { event: ReputationEvent },
    Truncated { event: ReputationEvent, requested: f64 },
    Existing { event: ReputationEvent },
    Dropped { requested: f64 },
}

impl AppendOutcome {
    #[must_use]
    pub fn event(&self) -> Option<&ReputationEvent> {
        match self {
            Self::Recorded { event } | Self::Truncated { event, .. } | Self::Existing { event } => {
                Some(event)
            }
            Self::Dropped { .. } => None,
        }
    }

    #[must_use]
    pub fn into_event(self) -> Option<ReputationEvent> {
        match self {
            Self::Recorded { event } | Self::Truncated { event, .. } | Self::Existing { event } => {
                Some(event)
            }
            Self::Dropped { .. } => None,
        }
    }

    /// True when this append wrote a new event.
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Recorded { .. } | Self::Truncated { .. })
    }
}

/// Decide how `draft` lands on a user whose ledger looks like `state`.
#[must_use]
pub fn plan_append(state: &UserLedgerState, draft: &EventDraft, now: DateTime<Utc>) -> AppendPlan {
    if draft.event_type == EventType::Penalty && draft.post_id.is_some() {
        if let Some(existing) = &state.existing_penalty {
            return AppendPlan::Existing(existing.clone());
        }
    }

    let mut points = draft.points;
    let mut truncated = false;
    if draft.event_type == EventType::Reward && !draft.reason.is_cap_exempt() {
        let headroom = (DAILY_REWARD_CAP - state.capped_rewards_in_window).max(0.0);
        if headroom <= f64::EPSILON {
            return AppendPlan::Drop;
        }
        if points > headroom {
            points = headroom;
            truncated = true;
        }
    }

    let score_before = ReputationScore::from_points_sum(state.points_sum).value();
    let score_after = ReputationScore::from_points_sum(state.points_sum + points).value();

    AppendPlan::Insert {
        event: ReputationEvent {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            event_type: draft.event_type,
            reason: draft.reason,
            points,
            post_id: draft.post_id,
            score_before,
            score_after,
            validated: draft.validated,
            note: draft.note.clone(),
            created_at: now,
        },
        truncated,
    }
}

/// True when `event` counts toward the daily reward cap.
#[must_use]
pub fn counts_toward_cap(event: &ReputationEvent) -> bool {
    event.event_type == EventType::Reward && !event.reason.is_cap_exempt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(event_type: EventType, reason: Reason, points: f64) -> EventDraft {
        EventDraft {
            user_id: Uuid::new_v4(),
            event_type,
            reason,
            points,
            post_id: None,
            validated: true,
            note: None,
        }
    }

    #[test]
    fn test_reward_truncated_to_headroom() {
        let state = UserLedgerState {
            capped_rewards_in_window: 1.5,
            ..Default::default()
        };
        let plan = plan_append(&state, &draft(EventType::Reward, Reason::QualityPost, 1.0), Utc::now());
        match plan {
            AppendPlan::Insert { event, truncated } => {
                assert!(truncated);
                assert!((event.points - 0.5).abs() < 1e-9);
                assert!((event.score_after - 70.5).abs() < 1e-9);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn test_reward_dropped_at_cap() {
        let state = UserLedgerState {
            capped_rewards_in_window: 2.0,
            ..Default::default()
        };
        let plan = plan_append(&state, &draft(EventType::Reward, Reason::HelpfulComment, 0.5), Utc::now());
        assert_eq!(plan, AppendPlan::Drop);
    }

    #[test]
    fn test_exempt_reward_ignores_cap() {
        let state = UserLedgerState {
            capped_rewards_in_window: 2.0,
            ..Default::default()
        };
        let plan = plan_append(
            &state,
            &draft(EventType::Reward, Reason::AppealOverturned, 9.6),
            Utc::now(),
        );
        assert!(matches!(plan, AppendPlan::Insert { truncated: false, .. }));
    }

    #[test]
    fn test_scores_clamp_at_bounds() {
        let state = UserLedgerState {
            points_sum: -65.0,
            ..Default::default()
        };
        let plan = plan_append(&state, &draft(EventType::Penalty, Reason::HateSpeech, -10.0), Utc::now());
        let AppendPlan::Insert { event, .. } = plan else {
            panic!("expected insert");
        };
        assert_eq!(event.score_before, 5.0);
        assert_eq!(event.score_after, 0.0);
    }
}
