// RewardWindowSweeper: periodically drops reward-window bookkeeping older than
// the trailing 24h cap window, plus idle rate limiter entries.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::ledger::ReputationLedger;
use super::rate_limit::RateLimiter;

pub struct RewardWindowSweeper {
    ledger: Arc<ReputationLedger>,
    limiters: Vec<Arc<RateLimiter>>,
    interval: Duration,
}

impl RewardWindowSweeper {
    #[must_use]
    pub fn new(ledger: Arc<ReputationLedger>, interval: Duration) -> Self {
        Self {
            ledger,
            limiters: Vec::new(),
            interval,
        }
    }

    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiters.push(limiter);
        self
    }

    /// Spawn the sweep loop. The returned handle resolves once `cancel_token` fires.
    #[must_use]
    pub fn spawn(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel_token).await })
    }

    async fn run(self, cancel_token: CancellationToken) {
        info!(interval = ?self.interval, "reward window sweeper started");

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("reward window sweeper received shutdown signal, stopping");
                    break;
                }
                () = sleep(self.interval) => self.sweep_once().await,
            }
        }

        info!("reward window sweeper shutdown complete");
    }

    pub async fn sweep_once(&self) {
        match self.ledger.prune_reward_windows(Utc::now()).await {
            Ok(removed) => debug!(removed, "reward windows pruned"),
            Err(e) => error!(error = %e, "reward window sweep failed"),
        }
        for limiter in &self.limiters {
            let removed = limiter.prune().await;
            debug!(removed, "rate limiter entries pruned");
        }
    }
}
