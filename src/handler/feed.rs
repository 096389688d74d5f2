use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::app::AppState;
use crate::domain::WeightConfig;
use crate::error::RepError;
use crate::ranking::{FeedPage, FeedRequest};

use super::identity::Caller;

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub page_size: Option<usize>,
    /// JSON-encoded weight object.
    pub weights: Option<String>,
    pub seed: Option<u64>,
    pub page: Option<usize>,
}

fn parse_weights(raw: Option<&str>) -> Result<WeightConfig, RepError> {
    match raw {
        None => Ok(WeightConfig::default()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| RepError::InvalidWeightConfig(e.to_string())),
    }
}

/// Handler for GET /feed
///
/// The page is built on its own task; if the client goes away the request
/// token is cancelled and the build stops before sampling.
pub async fn feed_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedPage>, RepError> {
    let request = FeedRequest {
        viewer_id: caller.user_id,
        page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        weights: parse_weights(query.weights.as_deref())?,
        seed: query.seed,
        page: query.page.unwrap_or(0),
    };

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let feed = state.feed.clone();
    let page = tokio::spawn(async move { feed.build(request, &cancel).await })
        .await
        .map_err(|e| RepError::Server(std::io::Error::other(e)))??;
    Ok(Json(page))
}
