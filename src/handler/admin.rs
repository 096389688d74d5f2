use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::domain::{AppealOutcome, AppealRecord, AppendOutcome, EventDraft, EventType, Reason};
use crate::error::RepError;
use crate::reputation::{LedgerStats, ReputationSummary};

use super::identity::AdminCaller;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AwardRequest {
    pub user_id: Uuid,
    pub points: f64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Handler for POST /reputation/award
pub async fn award_handler(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Json(body): Json<AwardRequest>,
) -> Result<Json<AppendOutcome>, RepError> {
    let note = match body.note.as_deref().map(str::trim) {
        Some(note) if !note.is_empty() => format!("admin:{} {note}", admin.user_id),
        _ => format!("admin:{}", admin.user_id),
    };
    let outcome = state
        .ledger
        .append(EventDraft {
            user_id: body.user_id,
            event_type: EventType::Reward,
            reason: Reason::AdminAward,
            points: body.points,
            post_id: None,
            validated: true,
            note: Some(note),
        })
        .await?;
    info!(admin_id = %admin.user_id, user_id = %body.user_id, points = body.points, "admin award granted");
    Ok(Json(outcome))
}

/// Handler for GET /reputation/stats
pub async fn stats_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Result<Json<LedgerStats>, RepError> {
    Ok(Json(state.ledger.stats(Utc::now()).await?))
}

#[derive(Deserialize, Debug, Default)]
pub struct LowReputationQuery {
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
}

/// Handler for GET /reputation/low-reputation
///
/// Defaults to users below the limited tier (score < 30).
pub async fn low_reputation_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<LowReputationQuery>,
) -> Result<Json<Vec<ReputationSummary>>, RepError> {
    let threshold = query.threshold.unwrap_or(30.0);
    if !threshold.is_finite() {
        return Err(RepError::Validation("threshold must be a number".into()));
    }
    let limit = query.limit.unwrap_or(50).min(500);
    Ok(Json(state.ledger.low_reputation(threshold, limit).await?))
}

/// Handler for GET /reputation/appeals/escalated
pub async fn escalated_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Result<Json<Vec<AppealRecord>>, RepError> {
    Ok(Json(state.appeals.escalated().await?))
}

#[derive(Deserialize, Debug)]
pub struct DecisionRequest {
    pub outcome: AppealOutcome,
}

/// Handler for POST /reputation/appeals/{appeal_id}/decision
pub async fn decision_handler(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(appeal_id): Path<Uuid>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<AppealRecord>, RepError> {
    let record = state
        .appeals
        .decide(appeal_id, admin.user_id, body.outcome)
        .await?;
    Ok(Json(record))
}
