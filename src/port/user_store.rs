use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::RepError;

/// Read access to users and their social graph.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn exists(&self, user_id: Uuid) -> Result<bool, RepError>;

    /// Authors the user follows. Fails with `UnknownUser` for unknown ids.
    async fn get_following(&self, user_id: Uuid) -> Result<HashSet<Uuid>, RepError>;

    /// Interest embedding; empty when the user has no history yet.
    async fn get_interest_embedding(&self, user_id: Uuid) -> Result<Vec<f32>, RepError>;
}
