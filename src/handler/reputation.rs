use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::domain::{AppealRecord, AppendOutcome, IssueTag, RiskReport};
use crate::error::RepError;
use crate::reputation::{CommunityReport, HistoryPage, ReportOutcome, ReputationSummary};

use super::identity::Caller;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Handler for GET /reputation/{user_id}
pub async fn summary_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ReputationSummary>, RepError> {
    Ok(Json(state.ledger.summary(user_id).await?))
}

#[derive(Deserialize, Debug, Default)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Handler for GET /reputation/me/history
pub async fn history_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, RepError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit == 0 || limit > MAX_HISTORY_LIMIT {
        return Err(RepError::Validation(format!(
            "limit must be between 1 and {MAX_HISTORY_LIMIT}"
        )));
    }
    let page = state
        .ledger
        .history(caller.user_id, limit, query.offset.unwrap_or(0))
        .await?;
    Ok(Json(page))
}

#[derive(Deserialize, Debug)]
pub struct AnalyzeRequest {
    pub content: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueWarning {
    pub issue: IssueTag,
    pub message: &'static str,
    pub points: f64,
}

/// Pre-publish warning shown to the author.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub has_issues: bool,
    pub warnings: Vec<IssueWarning>,
    pub suggested_penalty: f64,
    pub confidence: f64,
    /// The classifier could not be reached; the content was not checked.
    pub degraded: bool,
}

impl From<RiskReport> for AnalyzeResponse {
    fn from(report: RiskReport) -> Self {
        Self {
            has_issues: report.has_issues(),
            warnings: report
                .issues
                .iter()
                .map(|&issue| IssueWarning {
                    issue,
                    message: issue.warning(),
                    points: issue.penalty_points(),
                })
                .collect(),
            suggested_penalty: report.suggested_penalty,
            confidence: report.confidence,
            degraded: report.degraded,
        }
    }
}

/// Handler for POST /reputation/analyze
pub async fn analyze_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, RepError> {
    state.analyze_limiter.check(caller.user_id).await?;
    let report = state.analyzer.analyze(&body.content).await;
    Ok(Json(report.into()))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyRequest {
    pub post_id: Uuid,
    pub content: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyResponse {
    pub report: AnalyzeResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<AppendOutcome>,
}

/// Handler for POST /reputation/penalty ("post anyway")
pub async fn penalty_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<PenaltyRequest>,
) -> Result<Json<PenaltyResponse>, RepError> {
    let (report, penalty) = state
        .penalties
        .publish_anyway(caller.user_id, body.post_id, &body.content)
        .await?;
    Ok(Json(PenaltyResponse {
        report: report.into(),
        penalty,
    }))
}

/// Handler for POST /reputation/report
pub async fn report_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CommunityReport>,
) -> Result<Json<ReportOutcome>, RepError> {
    info!(reporter_id = %caller.user_id, post_id = %body.post_id, "community report received");
    Ok(Json(state.penalties.submit_report(caller.user_id, body).await?))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppealRequest {
    pub event_id: Uuid,
    pub reason: String,
}

/// Handler for POST /reputation/appeal
///
/// Answers 202 with the record in `ai_review`; the review runs in the background.
pub async fn appeal_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<AppealRequest>,
) -> Result<(StatusCode, Json<AppealRecord>), RepError> {
    let record = state
        .appeals
        .submit(caller.user_id, body.event_id, &body.reason)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

/// Handler for GET /reputation/appeals/{appeal_id}
pub async fn get_appeal_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(appeal_id): Path<Uuid>,
) -> Result<Json<AppealRecord>, RepError> {
    let record = state.appeals.get(appeal_id).await?;
    if record.user_id != caller.user_id && !caller.is_admin {
        return Err(RepError::Forbidden("not your appeal".into()));
    }
    Ok(Json(record))
}
