use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-request scoring result for one candidate. Never persisted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub recency_score: f64,
    pub similarity_score: f64,
    pub social_score: f64,
    pub trending_score: f64,
    pub reputation_multiplier: f64,
    pub composite_score: f64,
}
