use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A published post as the post store hands it to the ranking path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    #[serde(default)]
    pub content: String,
    /// Aggregate engagement (likes, comments, shares) already weighted by the store.
    #[serde(default)]
    pub engagement_score: f64,
    pub created_at: DateTime<Utc>,
}

/// A post together with its content embedding, if the store has one.
#[derive(Clone, Debug)]
pub struct CandidatePost {
    pub post: Post,
    pub embedding: Option<Vec<f32>>,
}

/// Everything the scorer needs to know about the viewer.
#[derive(Clone, Debug, Default)]
pub struct UserContext {
    pub user_id: Uuid,
    pub following: HashSet<Uuid>,
    pub interest_embedding: Vec<f32>,
}

/// Bounds applied when pulling the candidate pool.
#[derive(Clone, Copy, Debug)]
pub struct CandidateBounds {
    pub max_candidates: usize,
    pub max_age_hours: i64,
}

impl Default for CandidateBounds {
    fn default() -> Self {
        Self {
            max_candidates: 500,
            max_age_hours: 168,
        }
    }
}
