use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    CandidatePost, ReputationScore, ScoredCandidate, UserContext, WeightConfig,
};
use crate::error::RepError;
use crate::reputation::ReputationLedger;

/// Social factor when the viewer follows the author.
pub const FOLLOWED_SOCIAL_SCORE: f64 = 1.0;
/// Social factor for everyone else.
pub const UNFOLLOWED_SOCIAL_SCORE: f64 = 0.1;

const RECENCY_DECAY_HOURS: f64 = 24.0;

/// Computes the four ranking factors and the reputation-weighted composite.
pub struct ScoreComputer {
    ledger: Arc<ReputationLedger>,
}

impl ScoreComputer {
    pub fn new(ledger: Arc<ReputationLedger>) -> Self {
        Self { ledger }
    }

    /// Score every candidate. Output keeps the input order.
    pub async fn compute(
        &self,
        candidates: &[CandidatePost],
        viewer: &UserContext,
        weights: &WeightConfig,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredCandidate>, RepError> {
        weights.validate()?;
        let multipliers = self.author_multipliers(candidates).await?;
        Ok(score_candidates(candidates, viewer, weights, &multipliers, now))
    }

    /// One ledger read per distinct author.
    async fn author_multipliers(
        &self,
        candidates: &[CandidatePost],
    ) -> Result<HashMap<Uuid, f64>, RepError> {
        let authors: HashSet<Uuid> = candidates.iter().map(|c| c.post.author_id).collect();
        let lookups = authors.into_iter().map(|author_id| async move {
            let multiplier = match self.ledger.current_score(author_id).await {
                Ok(score) => score.tier().multiplier(),
                Err(RepError::UnknownUser(_)) => {
                    warn!(%author_id, "candidate author unknown, using starting tier");
                    ReputationScore::starting().tier().multiplier()
                }
                Err(e) => return Err(e),
            };
            Ok((author_id, multiplier))
        });
        Ok(try_join_all(lookups).await?.into_iter().collect())
    }
}

/// Pure scoring pass given precomputed author multipliers.
///
/// Authors missing from `multipliers` get the starting-tier multiplier.
#[must_use]
pub fn score_candidates(
    candidates: &[CandidatePost],
    viewer: &UserContext,
    weights: &WeightConfig,
    multipliers: &HashMap<Uuid, f64>,
    now: DateTime<Utc>,
) -> Vec<ScoredCandidate> {
    let default_multiplier = ReputationScore::starting().tier().multiplier();
    candidates
        .iter()
        .map(|candidate| {
            let post = &candidate.post;
            let hours = hours_since(post.created_at, now);
            let recency = recency_score(hours);
            let similarity = candidate
                .embedding
                .as_deref()
                .map_or(0.0, |embedding| {
                    cosine_similarity(embedding, &viewer.interest_embedding)
                });
            let social = social_score(viewer, post.author_id);
            let trending = trending_score(post.engagement_score, hours);
            let multiplier = multipliers
                .get(&post.author_id)
                .copied()
                .unwrap_or(default_multiplier);

            let weighted = recency * weights.recency()
                + similarity * weights.similarity()
                + social * weights.social()
                + trending * weights.trending();

            ScoredCandidate {
                post_id: post.id,
                author_id: post.author_id,
                recency_score: recency,
                similarity_score: similarity,
                social_score: social,
                trending_score: trending,
                reputation_multiplier: multiplier,
                composite_score: weighted * multiplier,
            }
        })
        .collect()
}

/// Age in hours; future timestamps count as zero.
#[must_use]
pub fn hours_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - created_at).num_milliseconds().max(0);
    millis as f64 / 3_600_000.0
}

#[must_use]
pub fn recency_score(hours: f64) -> f64 {
    (-hours.max(0.0) / RECENCY_DECAY_HOURS).exp()
}

/// Cosine similarity clamped to `[0, 1]`.
///
/// Empty, zero-norm or mismatched vectors score 0.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    if cosine.is_finite() {
        cosine.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[must_use]
pub fn social_score(viewer: &UserContext, author_id: Uuid) -> f64 {
    if viewer.following.contains(&author_id) {
        FOLLOWED_SOCIAL_SCORE
    } else {
        UNFOLLOWED_SOCIAL_SCORE
    }
}

/// Engagement velocity, capped at 1. The divisor never drops below one hour.
#[must_use]
pub fn trending_score(engagement: f64, hours: f64) -> f64 {
    if !engagement.is_finite() || engagement <= 0.0 {
        return 0.0;
    }
    (engagement / hours.max(1.0)).min(1.0)
}
