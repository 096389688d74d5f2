use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Score every user starts from.
pub const STARTING_SCORE: f64 = 70.0;
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Upper bound of capped reward points per user in any trailing 24h window.
pub const DAILY_REWARD_CAP: f64 = 2.0;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Penalty,
    Reward,
}

impl EventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Penalty => "penalty",
            Self::Reward => "reward",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    HateSpeech,
    Harassment,
    Spam,
    ExcessiveProfanity,
    PersonalAttack,
    MultipleViolations,
    QualityPost,
    HelpfulComment,
    PositiveEngagement,
    ValidatedReport,
    AdminAward,
    AppealOverturned,
}

impl Reason {
    /// The event type a reason belongs to.
    #[must_use]
    pub const fn event_type(self) -> EventType {
        match self {
            Self::HateSpeech
            | Self::Harassment
            | Self::Spam
            | Self::ExcessiveProfanity
            | Self::PersonalAttack
            | Self::MultipleViolations => EventType::Penalty,
            Self::QualityPost
            | Self::HelpfulComment
            | Self::PositiveEngagement
            | Self::ValidatedReport
            | Self::AdminAward
            | Self::AppealOverturned => EventType::Reward,
        }
    }

    /// Rewards with these reasons neither count toward nor are limited by the daily cap.
    #[must_use]
    pub const fn is_cap_exempt(self) -> bool {
        matches!(self, Self::AdminAward | Self::AppealOverturned)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HateSpeech => "hate_speech",
            Self::Harassment => "harassment",
            Self::Spam => "spam",
            Self::ExcessiveProfanity => "excessive_profanity",
            Self::PersonalAttack => "personal_attack",
            Self::MultipleViolations => "multiple_violations",
            Self::QualityPost => "quality_post",
            Self::HelpfulComment => "helpful_comment",
            Self::PositiveEngagement => "positive_engagement",
            Self::ValidatedReport => "validated_report",
            Self::AdminAward => "admin_award",
            Self::AppealOverturned => "appeal_overturned",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger entry. Written once, never edited or deleted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReputationEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub reason: Reason,
    pub points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<Uuid>,
    pub score_before: f64,
    pub score_after: f64,
    pub validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user's current standing, always inside `[0, 100]`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct ReputationScore(f64);

impl ReputationScore {
    /// Score implied by the raw sum of all event points.
    #[must_use]
    pub fn from_points_sum(sum: f64) -> Self {
        Self::clamped(STARTING_SCORE + sum)
    }

    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self(MIN_SCORE);
        }
        Self(value.clamp(MIN_SCORE, MAX_SCORE))
    }

    #[must_use]
    pub fn starting() -> Self {
        Self(STARTING_SCORE)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Integer form exposed to clients.
    #[must_use]
    pub fn as_int(self) -> u8 {
        // value is clamped to [0, 100]
        self.0.round() as u8
    }

    #[must_use]
    pub fn tier(self) -> Tier {
        Tier::from_score(self.0)
    }
}

impl Default for ReputationScore {
    fn default() -> Self {
        Self::starting()
    }
}

/// Score band mapping to a fixed visibility multiplier.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Trusted,
    Standard,
    Limited,
    Restricted,
}

impl Tier {
    pub const ALL: [Tier; 4] = [
        Tier::Trusted,
        Tier::Standard,
        Tier::Limited,
        Tier::Restricted,
    ];

    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Trusted
        } else if score >= 60.0 {
            Self::Standard
        } else if score >= 30.0 {
            Self::Limited
        } else {
            Self::Restricted
        }
    }

    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Trusted => 1.1,
            Self::Standard => 1.0,
            Self::Limited => 0.9,
            Self::Restricted => 0.8,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trusted => "trusted",
            Self::Standard => "standard",
            Self::Limited => "limited",
            Self::Restricted => "restricted",
        }
    }
}
