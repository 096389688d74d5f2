use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{CandidateBounds, Post};
use crate::error::RepError;
use crate::port::{PostStore, UserStore};

#[derive(Clone, Debug)]
struct StoredPost {
    post: Post,
    embedding: Option<Vec<f32>>,
}

/// Post store backed by a map; stands in for the real post service.
#[derive(Default)]
pub struct MemoryPostStore {
    posts: RwLock<HashMap<Uuid, StoredPost>>,
}

impl MemoryPostStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, post: Post, embedding: Option<Vec<f32>>) {
        self.posts
            .write()
            .await
            .insert(post.id, StoredPost { post, embedding });
    }

    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn list_candidates(
        &self,
        viewer_id: Uuid,
        bounds: CandidateBounds,
    ) -> Result<Vec<Post>, RepError> {
        let oldest = Utc::now() - Duration::hours(bounds.max_age_hours);
        let mut posts: Vec<Post> = self
            .posts
            .read()
            .await
            .values()
            .filter(|p| p.post.author_id != viewer_id && p.post.created_at >= oldest)
            .map(|p| p.post.clone())
            .collect();
        // Newest first so the bound keeps the freshest posts.
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        posts.truncate(bounds.max_candidates);
        Ok(posts)
    }

    async fn get_embedding(&self, post_id: Uuid) -> Result<Option<Vec<f32>>, RepError> {
        Ok(self
            .posts
            .read()
            .await
            .get(&post_id)
            .and_then(|p| p.embedding.clone()))
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>, RepError> {
        Ok(self.posts.read().await.get(&post_id).map(|p| p.post.clone()))
    }
}

#[derive(Clone, Debug, Default)]
struct StoredUser {
    following: HashSet<Uuid>,
    interest_embedding: Vec<f32>,
}

/// User store backed by a map; stands in for the real user service.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, StoredUser>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: Uuid, following: HashSet<Uuid>, interest_embedding: Vec<f32>) {
        self.users.write().await.insert(
            user_id,
            StoredUser {
                following,
                interest_embedding,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn exists(&self, user_id: Uuid) -> Result<bool, RepError> {
        Ok(self.users.read().await.contains_key(&user_id))
    }

    async fn get_following(&self, user_id: Uuid) -> Result<HashSet<Uuid>, RepError> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|u| u.following.clone())
            .ok_or(RepError::UnknownUser(user_id))
    }

    async fn get_interest_embedding(&self, user_id: Uuid) -> Result<Vec<f32>, RepError> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|u| u.interest_embedding.clone())
            .ok_or(RepError::UnknownUser(user_id))
    }
}
