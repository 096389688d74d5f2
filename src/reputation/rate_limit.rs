use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::RepError;

/// Per-user sliding-window limiter.
///
/// A limit of zero disables the limiter.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<Uuid, VecDeque<Instant>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn per_minute(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    #[must_use]
    pub fn per_day(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(24 * 60 * 60))
    }

    /// Record one hit for `user_id`, or fail with the time until a slot frees up.
    pub async fn check(&self, user_id: Uuid) -> Result<(), RepError> {
        self.check_at(user_id, Instant::now()).await
    }

    pub async fn check_at(&self, user_id: Uuid, now: Instant) -> Result<(), RepError> {
        if self.limit == 0 {
            return Ok(());
        }
        let mut hits = self.hits.lock().await;
        let window = hits.entry(user_id).or_default();
        while window
            .front()
            .is_some_and(|&hit| now.saturating_duration_since(hit) >= self.window)
        {
            window.pop_front();
        }
        if window.len() >= self.limit {
            let oldest = window.front().copied().unwrap_or(now);
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(oldest));
            return Err(RepError::RateLimitExceeded { retry_after });
        }
        window.push_back(now);
        Ok(())
    }

    /// Forget users whose window has fully expired.
    pub async fn prune(&self) -> usize {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let before = hits.len();
        hits.retain(|_, window| {
            window
                .back()
                .is_some_and(|&hit| now.saturating_duration_since(hit) < self.window)
        });
        before - hits.len()
    }
}
