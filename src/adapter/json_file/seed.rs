// Loads a JSON fixture of users and posts into the in-memory stores.
// Used for local runs and demos where no real post/user service is wired in.

use crate::adapter::memory::{MemoryPostStore, MemoryUserStore};
use crate::domain::Post;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub id: Uuid,
    #[serde(default)]
    pub following: HashSet<Uuid>,
    #[serde(default)]
    pub interest_embedding: Vec<f32>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SeedPost {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub posts: Vec<SeedPost>,
}

impl SeedData {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read seed data {path:?}"))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid seed data in {path:?}"))
    }

    /// Insert everything into the stores. Returns `(users, posts)` loaded.
    pub async fn apply(self, users: &MemoryUserStore, posts: &MemoryPostStore) -> (usize, usize) {
        let user_count = self.users.len();
        let post_count = self.posts.len();
        for user in self.users {
            users
                .insert(user.id, user.following, user.interest_embedding)
                .await;
        }
        for seed in self.posts {
            posts.insert(seed.post, seed.embedding).await;
        }
        (user_count, post_count)
    }
}
