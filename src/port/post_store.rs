use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CandidateBounds, Post};
use crate::error::RepError;

/// Read access to published posts.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Candidate pool for a viewer's feed, already bounded by age and count.
    async fn list_candidates(
        &self,
        viewer_id: Uuid,
        bounds: CandidateBounds,
    ) -> Result<Vec<Post>, RepError>;

    /// Content embedding, if one has been computed for the post.
    async fn get_embedding(&self, post_id: Uuid) -> Result<Option<Vec<f32>>, RepError>;

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>, RepError>;
}
