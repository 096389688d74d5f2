use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{AppendOutcome, EventDraft, EventType, Reason, ReputationEvent, RiskReport};
use crate::error::RepError;
use crate::port::{PostStore, UserStore};

use super::ledger::ReputationLedger;
use super::risk::{ClassifierVerdict, ContentRiskAnalyzer};

/// Reward for a reporter whose report led to a new penalty.
pub const VALIDATED_REPORT_REWARD: f64 = 0.5;

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommunityReport {
    pub target_user_id: Uuid,
    pub post_id: Uuid,
    /// Reporter's justification.
    pub reason: String,
    /// Reported text, used only when the post store has no content for the post.
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Classifier confirmed a violation; a penalty exists for the post.
    Validated,
    /// Classifier found nothing actionable.
    Dismissed,
    /// The justification itself was abusive.
    Rejected,
    /// Classifier unavailable; report accepted without action.
    Unverified,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutcome {
    pub status: ReportStatus,
    pub risk: RiskReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<ReputationEvent>,
    /// True when the post had already been penalized before this report.
    pub duplicate: bool,
}

/// Turns risk reports and community reports into ledger penalties.
pub struct PenaltyEngine {
    analyzer: Arc<ContentRiskAnalyzer>,
    ledger: Arc<ReputationLedger>,
    posts: Arc<dyn PostStore>,
    users: Arc<dyn UserStore>,
}

impl PenaltyEngine {
    pub fn new(
        analyzer: Arc<ContentRiskAnalyzer>,
        ledger: Arc<ReputationLedger>,
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            analyzer,
            ledger,
            posts,
            users,
        }
    }

    /// Pre-publish check. Never fails and never writes.
    pub async fn evaluate(&self, content: &str, post_id: Uuid, author_id: Uuid) -> RiskReport {
        let report = self.analyzer.analyze(content).await;
        if report.has_issues() {
            info!(
                %post_id,
                %author_id,
                issues = ?report.issues,
                "pre-publish warning issued"
            );
        }
        report
    }

    /// Record the penalty for a report the author chose to publish anyway.
    ///
    /// Returns `None` when the report carries no issues. All issues collapse
    /// into a single event; the ledger keeps it to one per post.
    pub async fn apply_penalty(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        report: &RiskReport,
    ) -> Result<Option<AppendOutcome>, RepError> {
        let Some(draft) = penalty_draft(author_id, post_id, report) else {
            return Ok(None);
        };
        self.ledger.append(draft).await.map(Some)
    }

    /// "Post anyway": re-evaluate the content server-side, then apply.
    pub async fn publish_anyway(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> Result<(RiskReport, Option<AppendOutcome>), RepError> {
        let report = self.evaluate(content, post_id, author_id).await;
        let outcome = self.apply_penalty(author_id, post_id, &report).await?;
        Ok((report, outcome))
    }

    pub async fn submit_report(
        &self,
        reporter_id: Uuid,
        report: CommunityReport,
    ) -> Result<ReportOutcome, RepError> {
        if reporter_id == report.target_user_id {
            return Err(RepError::Validation("users cannot report themselves".into()));
        }
        let justification = report.reason.trim();
        if justification.is_empty() {
            return Err(RepError::Validation("a report needs a reason".into()));
        }
        if !self.users.exists(report.target_user_id).await? {
            return Err(RepError::UnknownUser(report.target_user_id));
        }
        let post = self
            .posts
            .get_post(report.post_id)
            .await?
            .ok_or_else(|| RepError::not_found("Post", report.post_id))?;
        if post.author_id != report.target_user_id {
            return Err(RepError::Validation(
                "reported post does not belong to the reported user".into(),
            ));
        }
        let content = if post.content.trim().is_empty() {
            report.content.as_str()
        } else {
            post.content.as_str()
        };

        // Weaponized reports: an abusive justification is rejected outright,
        // and one that could not be checked never reaches the penalty path.
        let classification = match self.analyzer.classify(justification).await {
            ClassifierVerdict::Available(classification) => classification,
            ClassifierVerdict::Degraded => {
                warn!(
                    %reporter_id,
                    post_id = %report.post_id,
                    "report left unverified, justification could not be checked"
                );
                return Ok(ReportOutcome {
                    status: ReportStatus::Unverified,
                    risk: RiskReport::degraded(),
                    penalty: None,
                    duplicate: false,
                });
            }
        };
        let justification_risk = self.analyzer.report_from(&classification);
        if justification_risk.has_issues() {
            warn!(
                %reporter_id,
                post_id = %report.post_id,
                issues = ?justification_risk.issues,
                "report rejected, justification is abusive"
            );
            return Ok(ReportOutcome {
                status: ReportStatus::Rejected,
                risk: justification_risk,
                penalty: None,
                duplicate: false,
            });
        }

        let risk = self.analyzer.analyze(content).await;
        if risk.degraded {
            return Ok(ReportOutcome {
                status: ReportStatus::Unverified,
                risk,
                penalty: None,
                duplicate: false,
            });
        }
        if !risk.has_issues() {
            info!(%reporter_id, post_id = %report.post_id, "report dismissed");
            return Ok(ReportOutcome {
                status: ReportStatus::Dismissed,
                risk,
                penalty: None,
                duplicate: false,
            });
        }

        let outcome = self
            .apply_penalty(report.target_user_id, report.post_id, &risk)
            .await?;
        let duplicate = outcome
            .as_ref()
            .is_some_and(|o| matches!(o, AppendOutcome::Existing { .. }));
        let is_new = outcome.as_ref().is_some_and(AppendOutcome::is_new);

        if is_new {
            self.reward_reporter(reporter_id, report.post_id).await;
        }

        Ok(ReportOutcome {
            status: ReportStatus::Validated,
            risk,
            penalty: outcome.and_then(AppendOutcome::into_event),
            duplicate,
        })
    }

    async fn reward_reporter(&self, reporter_id: Uuid, post_id: Uuid) {
        let draft = EventDraft {
            user_id: reporter_id,
            event_type: EventType::Reward,
            reason: Reason::ValidatedReport,
            points: VALIDATED_REPORT_REWARD,
            post_id: Some(post_id),
            validated: true,
            note: None,
        };
        // The report already succeeded; a missed reward is not worth failing it.
        if let Err(e) = self.ledger.append(draft).await {
            warn!(%reporter_id, error = %e, "failed to reward reporter");
        }
    }
}

/// Single combined event for every issue in `report`.
fn penalty_draft(author_id: Uuid, post_id: Uuid, report: &RiskReport) -> Option<EventDraft> {
    let (reason, note) = match report.issues.as_slice() {
        [] => return None,
        [single] => (single.reason(), None),
        many => (
            Reason::MultipleViolations,
            Some(format!(
                "issues: {}",
                many.iter()
                    .map(|tag| tag.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        ),
    };
    Some(EventDraft {
        user_id: author_id,
        event_type: EventType::Penalty,
        reason,
        points: report.issues.iter().map(|tag| tag.penalty_points()).sum(),
        post_id: Some(post_id),
        validated: !report.degraded,
        note,
    })
}
