use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    AppealOutcome, AppealRecord, AppealStatus, EventDraft, EventType, IssueTag, Reason,
    ReputationEvent,
};
use crate::error::RepError;
use crate::port::{AppealRepository, Classification, PostStore};

use super::ledger::{ReputationLedger, compensation_marker};
use super::rate_limit::RateLimiter;
use super::risk::{ClassifierVerdict, ContentRiskAnalyzer};

/// Multiplier applied to the original penalty when an appeal is overturned.
pub const COMPENSATION_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Copy)]
pub struct AppealsConfig {
    /// Confidence the AI review needs to decide on its own.
    pub threshold: f64,
}

impl Default for AppealsConfig {
    fn default() -> Self {
        Self { threshold: 0.7 }
    }
}

/// What the automated review concluded.
#[derive(Debug, Clone, Copy, PartialEq)]
enum AiDecision {
    Resolve { outcome: AppealOutcome, confidence: f64 },
    Escalate { confidence: Option<f64> },
}

/// Drives appeals through AI review, escalation and admin decisions.
pub struct AppealsProcessor {
    appeals: Arc<dyn AppealRepository>,
    ledger: Arc<ReputationLedger>,
    posts: Arc<dyn PostStore>,
    analyzer: Arc<ContentRiskAnalyzer>,
    limiter: Arc<RateLimiter>,
    config: AppealsConfig,
    // Serializes terminal transitions so compensation is written at most once.
    decisions: Mutex<()>,
}

impl AppealsProcessor {
    pub fn new(
        appeals: Arc<dyn AppealRepository>,
        ledger: Arc<ReputationLedger>,
        posts: Arc<dyn PostStore>,
        analyzer: Arc<ContentRiskAnalyzer>,
        limiter: Arc<RateLimiter>,
        config: AppealsConfig,
    ) -> Self {
        Self {
            appeals,
            ledger,
            posts,
            analyzer,
            limiter,
            config,
            decisions: Mutex::new(()),
        }
    }

    /// File an appeal and kick off its AI review in the background.
    ///
    /// The returned record is in `ai_review`; poll `get` for the result.
    pub async fn submit(
        self: &Arc<Self>,
        user_id: Uuid,
        event_id: Uuid,
        reason: &str,
    ) -> Result<AppealRecord, RepError> {
        let record = self.open(user_id, event_id, reason).await?;

        let this = Arc::clone(self);
        let appeal_id = record.id;
        tokio::spawn(async move {
            if let Err(e) = this.review(appeal_id).await {
                warn!(%appeal_id, error = %e, "background appeal review failed");
            }
        });

        Ok(record)
    }

    /// Validate and store a new appeal in `ai_review` without reviewing it.
    pub async fn open(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        reason: &str,
    ) -> Result<AppealRecord, RepError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(RepError::Validation("an appeal needs a justification".into()));
        }
        let event = self.ledger.event(event_id).await?;
        if event.user_id != user_id {
            return Err(RepError::Forbidden(
                "only the owner of an event can appeal it".into(),
            ));
        }
        if event.event_type != EventType::Penalty {
            return Err(RepError::Validation("only penalties can be appealed".into()));
        }
        if self.appeals.find_by_event(event_id).await?.is_some()
            || self.ledger.compensation_for(&event).await?.is_some()
        {
            return Err(RepError::AlreadyAppealed(event_id));
        }
        self.limiter.check(user_id).await?;

        let mut record = AppealRecord::new(event_id, user_id, reason.to_owned(), Utc::now());
        record.advance(AppealStatus::AiReview)?;
        self.appeals.insert(record.clone()).await?;
        info!(appeal_id = %record.id, %event_id, %user_id, "appeal submitted");
        Ok(record)
    }

    pub async fn get(&self, appeal_id: Uuid) -> Result<AppealRecord, RepError> {
        self.appeals
            .get(appeal_id)
            .await?
            .ok_or_else(|| RepError::not_found("Appeal", appeal_id))
    }

    /// Run the AI review for an appeal in `ai_review`.
    ///
    /// Reviewing an appeal that has already left `ai_review` returns it unchanged.
    pub async fn review(&self, appeal_id: Uuid) -> Result<AppealRecord, RepError> {
        let record = self.get(appeal_id).await?;
        if record.status != AppealStatus::AiReview {
            return Ok(record);
        }
        let event = self.ledger.event(record.event_id).await?;
        let decision = self.ai_decision(&record, &event).await?;

        let _guard = self.decisions.lock().await;
        let mut record = self.get(appeal_id).await?;
        if record.status != AppealStatus::AiReview {
            return Ok(record);
        }

        match decision {
            AiDecision::Resolve {
                outcome,
                confidence,
            } => {
                if outcome == AppealOutcome::Overturned {
                    self.compensate(&record, &event).await?;
                }
                record.resolve(outcome, Some(confidence), Utc::now())?;
                info!(
                    %appeal_id,
                    outcome = ?outcome,
                    confidence,
                    "appeal resolved by ai review"
                );
            }
            AiDecision::Escalate { confidence } => {
                record.advance(AppealStatus::Escalated)?;
                record.confidence_score = confidence;
                info!(%appeal_id, ?confidence, "appeal escalated to admin review");
            }
        }
        self.appeals.update(record.clone()).await?;
        Ok(record)
    }

    async fn ai_decision(
        &self,
        record: &AppealRecord,
        event: &ReputationEvent,
    ) -> Result<AiDecision, RepError> {
        let post = match event.post_id {
            Some(post_id) => self.posts.get_post(post_id).await?,
            None => None,
        };
        let Some(post) = post else {
            return Ok(AiDecision::Escalate { confidence: None });
        };

        let text = format!("{}\n\n{}", post.content, record.reason);
        match self.analyzer.classify(&text).await {
            ClassifierVerdict::Available(classification) => {
                Ok(decide(&classification, self.config.threshold))
            }
            ClassifierVerdict::Degraded => Ok(AiDecision::Escalate { confidence: None }),
        }
    }

    pub async fn escalated(&self) -> Result<Vec<AppealRecord>, RepError> {
        let mut escalated = self.appeals.list_by_status(AppealStatus::Escalated).await?;
        escalated.sort_by_key(|a| a.created_at);
        Ok(escalated)
    }

    /// Admin decision on an escalated appeal.
    pub async fn decide(
        &self,
        appeal_id: Uuid,
        admin_id: Uuid,
        outcome: AppealOutcome,
    ) -> Result<AppealRecord, RepError> {
        if outcome == AppealOutcome::Pending {
            return Err(RepError::Validation(
                "a decision must be upheld or overturned".into(),
            ));
        }

        let _guard = self.decisions.lock().await;
        let mut record = self.get(appeal_id).await?;
        if record.status == AppealStatus::Escalated {
            record.advance(AppealStatus::AdminReview)?;
        } else if record.status != AppealStatus::AdminReview {
            return Err(RepError::InvalidTransition {
                from: record.status.as_str(),
                to: AppealStatus::AdminReview.as_str(),
            });
        }

        if outcome == AppealOutcome::Overturned {
            let event = self.ledger.event(record.event_id).await?;
            self.compensate(&record, &event).await?;
        }
        record.reviewer_id = Some(admin_id);
        record.resolve(outcome, record.confidence_score, Utc::now())?;
        self.appeals.update(record.clone()).await?;
        info!(%appeal_id, %admin_id, outcome = ?outcome, "appeal decided by admin");
        Ok(record)
    }

    async fn compensate(
        &self,
        record: &AppealRecord,
        event: &ReputationEvent,
    ) -> Result<(), RepError> {
        if let Some(paid) = self.ledger.compensation_for(event).await? {
            warn!(
                appeal_id = %record.id,
                event_id = %event.id,
                compensation_id = %paid.id,
                "penalty already compensated, not paying again"
            );
            return Ok(());
        }
        let draft = EventDraft {
            user_id: event.user_id,
            event_type: EventType::Reward,
            reason: Reason::AppealOverturned,
            points: event.points.abs() * COMPENSATION_FACTOR,
            post_id: event.post_id,
            validated: true,
            note: Some(format!("appeal:{} {}", record.id, compensation_marker(event.id))),
        };
        self.ledger.append(draft).await?;
        Ok(())
    }
}

/// Map the strongest issue label onto a decision.
fn decide(classification: &Classification, threshold: f64) -> AiDecision {
    let violation = classification
        .labels
        .iter()
        .filter(|label| IssueTag::from_label(&label.label).is_some())
        .map(|label| label.confidence)
        .fold(0.0_f64, f64::max);

    if violation > threshold {
        AiDecision::Resolve {
            outcome: AppealOutcome::Upheld,
            confidence: violation,
        }
    } else if 1.0 - violation > threshold {
        AiDecision::Resolve {
            outcome: AppealOutcome::Overturned,
            confidence: 1.0 - violation,
        }
    } else {
        AiDecision::Escalate {
            confidence: Some(violation),
        }
    }
}
