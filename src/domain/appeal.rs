use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RepError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppealStage {
    AiReview,
    AdminReview,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppealOutcome {
    Pending,
    Upheld,
    Overturned,
}

/// Position in the appeal state machine.
///
/// ```text
/// submitted -> ai_review -> resolved
///                        -> escalated -> admin_review -> resolved
/// ```
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Submitted,
    AiReview,
    Escalated,
    AdminReview,
    Resolved,
}

impl AppealStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::AiReview => "ai_review",
            Self::Escalated => "escalated",
            Self::AdminReview => "admin_review",
            Self::Resolved => "resolved",
        }
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::AiReview)
                | (Self::AiReview, Self::Resolved)
                | (Self::AiReview, Self::Escalated)
                | (Self::Escalated, Self::AdminReview)
                | (Self::AdminReview, Self::Resolved)
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppealRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub stage: AppealStage,
    pub status: AppealStatus,
    pub outcome: AppealOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl AppealRecord {
    #[must_use]
    pub fn new(event_id: Uuid, user_id: Uuid, reason: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            reason,
            stage: AppealStage::AiReview,
            status: AppealStatus::Submitted,
            outcome: AppealOutcome::Pending,
            confidence_score: None,
            reviewer_id: None,
            created_at: now,
            decided_at: None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status == AppealStatus::Resolved
    }

    /// Move to `next`, rejecting anything the state machine does not allow.
    pub fn advance(&mut self, next: AppealStatus) -> Result<(), RepError> {
        if !self.status.can_transition_to(next) {
            return Err(RepError::InvalidTransition {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        if next == AppealStatus::AdminReview {
            self.stage = AppealStage::AdminReview;
        }
        Ok(())
    }

    /// Terminal transition. `outcome` must not be `Pending`.
    pub fn resolve(
        &mut self,
        outcome: AppealOutcome,
        confidence: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<(), RepError> {
        if outcome == AppealOutcome::Pending {
            return Err(RepError::Validation(
                "an appeal cannot be resolved as pending".into(),
            ));
        }
        self.advance(AppealStatus::Resolved)?;
        self.outcome = outcome;
        self.confidence_score = confidence;
        self.decided_at = Some(now);
        Ok(())
    }
}
