use chrono::Utc;
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{CandidateBounds, CandidatePost, ScoredCandidate, UserContext, WeightConfig};
use crate::error::RepError;
use crate::port::{PostStore, UserStore};

use super::sampler::ProbabilityCloudSampler;
use super::scorer::ScoreComputer;

pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub viewer_id: Uuid,
    pub page_size: usize,
    pub weights: WeightConfig,
    pub seed: Option<u64>,
    /// Zero-based page within the seeded session.
    pub page: usize,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedStats {
    pub candidate_count: usize,
    pub average_recency: f64,
    pub average_similarity: f64,
    pub average_social: f64,
    pub average_trending: f64,
    pub average_multiplier: f64,
    pub average_composite: f64,
}

impl FeedStats {
    fn from_scored(scored: &[ScoredCandidate]) -> Self {
        if scored.is_empty() {
            return Self::default();
        }
        let n = scored.len() as f64;
        let avg = |f: fn(&ScoredCandidate) -> f64| scored.iter().map(f).sum::<f64>() / n;
        Self {
            candidate_count: scored.len(),
            average_recency: avg(|c| c.recency_score),
            average_similarity: avg(|c| c.similarity_score),
            average_social: avg(|c| c.social_score),
            average_trending: avg(|c| c.trending_score),
            average_multiplier: avg(|c| c.reputation_multiplier),
            average_composite: avg(|c| c.composite_score),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub post_ids: Vec<Uuid>,
    pub items: Vec<ScoredCandidate>,
    pub stats: FeedStats,
    /// Decimal string, so clients limited to 53-bit numbers can replay it.
    #[serde(serialize_with = "seed_as_string")]
    pub seed: u64,
    pub page: usize,
    pub page_size: usize,
}

fn seed_as_string<S: serde::Serializer>(seed: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(seed)
}

/// Candidate fetch, scoring and sampling for one feed request.
pub struct FeedOrchestrator {
    posts: Arc<dyn PostStore>,
    users: Arc<dyn UserStore>,
    scorer: ScoreComputer,
    sampler: ProbabilityCloudSampler,
    bounds: CandidateBounds,
}

impl FeedOrchestrator {
    pub fn new(
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
        scorer: ScoreComputer,
        sampler: ProbabilityCloudSampler,
        bounds: CandidateBounds,
    ) -> Self {
        Self {
            posts,
            users,
            scorer,
            sampler,
            bounds,
        }
    }

    /// Build one page. A cancelled request returns `Cancelled`, never a partial page.
    pub async fn build(
        &self,
        request: FeedRequest,
        cancel: &CancellationToken,
    ) -> Result<FeedPage, RepError> {
        if request.page_size == 0 || request.page_size > MAX_PAGE_SIZE {
            return Err(RepError::Validation(format!(
                "pageSize must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        request.weights.validate()?;

        let viewer = self.viewer_context(request.viewer_id).await?;
        let candidates = self.candidates(request.viewer_id).await?;
        if cancel.is_cancelled() {
            return Err(RepError::Cancelled);
        }

        let scored = self
            .scorer
            .compute(&candidates, &viewer, &request.weights, Utc::now())
            .await?;
        let stats = FeedStats::from_scored(&scored);

        if cancel.is_cancelled() {
            debug!(viewer_id = %request.viewer_id, "feed request cancelled before sampling");
            return Err(RepError::Cancelled);
        }

        // Page P replays the seeded draw and keeps only its last slice.
        let depth = request.page.saturating_add(1).saturating_mul(request.page_size);
        let sample = self.sampler.sample(scored, depth, request.seed);
        let items: Vec<ScoredCandidate> = sample
            .items
            .into_iter()
            .skip(request.page.saturating_mul(request.page_size))
            .collect();

        info!(
            viewer_id = %request.viewer_id,
            candidates = stats.candidate_count,
            returned = items.len(),
            seed = sample.seed,
            page = request.page,
            "feed built"
        );

        Ok(FeedPage {
            post_ids: items.iter().map(|c| c.post_id).collect(),
            items,
            stats,
            seed: sample.seed,
            page: request.page,
            page_size: request.page_size,
        })
    }

    async fn viewer_context(&self, viewer_id: Uuid) -> Result<UserContext, RepError> {
        let (following, interest_embedding) = tokio::try_join!(
            self.users.get_following(viewer_id),
            self.users.get_interest_embedding(viewer_id),
        )?;
        Ok(UserContext {
            user_id: viewer_id,
            following,
            interest_embedding,
        })
    }

    async fn candidates(&self, viewer_id: Uuid) -> Result<Vec<CandidatePost>, RepError> {
        let posts = self.posts.list_candidates(viewer_id, self.bounds).await?;
        let embeddings = try_join_all(posts.iter().map(|p| self.posts.get_embedding(p.id))).await?;
        Ok(posts
            .into_iter()
            .zip(embeddings)
            .map(|(post, embedding)| CandidatePost { post, embedding })
            .collect())
    }
}
