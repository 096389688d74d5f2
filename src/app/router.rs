use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handler::admin::{
    award_handler, decision_handler, escalated_handler, low_reputation_handler, stats_handler,
};
use crate::handler::feed::feed_handler;
use crate::handler::health::health_handler;
use crate::handler::reputation::{
    analyze_handler, appeal_handler, get_appeal_handler, history_handler, penalty_handler,
    report_handler, summary_handler,
};

use super::state::AppState;

/// Build the HTTP router (health, feed, reputation and admin routes).
pub fn router(state: AppState) -> Router {
    let v1_health_router = Router::new().route("/v1/health", get(health_handler));

    let feed_router = Router::new().route("/feed", get(feed_handler));

    let reputation_router = Router::new()
        .route("/reputation/me/history", get(history_handler))
        .route("/reputation/analyze", post(analyze_handler))
        .route("/reputation/penalty", post(penalty_handler))
        .route("/reputation/report", post(report_handler))
        .route("/reputation/appeal", post(appeal_handler))
        .route("/reputation/appeals/{appeal_id}", get(get_appeal_handler))
        .route("/reputation/{user_id}", get(summary_handler));

    let admin_router = Router::new()
        .route("/reputation/award", post(award_handler))
        .route("/reputation/stats", get(stats_handler))
        .route("/reputation/low-reputation", get(low_reputation_handler))
        .route("/reputation/appeals/escalated", get(escalated_handler))
        .route(
            "/reputation/appeals/{appeal_id}/decision",
            post(decision_handler),
        );

    Router::new()
        .merge(v1_health_router)
        .merge(
            feed_router
                .merge(reputation_router)
                .merge(admin_router)
                .with_state(state),
        )
        .layer(TraceLayer::new_for_http())
}
