use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use repute::app::router::router;
use repute::domain::{EventType, Reason};
use repute::test_support::{Harness, MockClassifier};
use serde_json::{Value, json};
use uuid::Uuid;

fn as_user(request: TestRequest, user_id: Uuid) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(&user_id.to_string()).unwrap(),
    )
}

fn as_admin(request: TestRequest, user_id: Uuid) -> TestRequest {
    as_user(request, user_id).add_header(
        HeaderName::from_static("x-user-role"),
        HeaderValue::from_static("admin"),
    )
}

fn encode_query_json(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '{' => "%7B".to_string(),
            '}' => "%7D".to_string(),
            '"' => "%22".to_string(),
            ':' => "%3A".to_string(),
            ',' => "%2C".to_string(),
            other => other.to_string(),
        })
        .collect()
}

fn classifier() -> MockClassifier {
    MockClassifier::new()
        .with_rule("buy now", &[("spam", 0.95)])
        .with_rule("you idiot", &[("personal_attack", 0.9), ("harassment", 0.8)])
}

async fn server() -> (TestServer, Harness) {
    let harness = Harness::new(classifier()).await;
    let server = TestServer::new(router(harness.state.clone())).unwrap();
    (server, harness)
}

#[tokio::test]
async fn test_health_endpoint_returns_healthy() {
    let (server, _) = server().await;
    let response = server.get("/v1/health").await;
    response.assert_status_ok();
    response.assert_text("Healthy");
}

#[tokio::test]
async fn test_reputation_summary_for_new_user() {
    let (server, harness) = server().await;
    let user = harness.user().await;

    let response = server.get(&format!("/reputation/{user}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["score"], 70);
    assert_eq!(body["tier"], "standard");
    assert_eq!(body["visibilityMultiplier"], 1.0);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let (server, _) = server().await;
    let response = server.get(&format!("/reputation/{}", Uuid::new_v4())).await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Unknown user"));
}

#[tokio::test]
async fn test_history_requires_identity() {
    let (server, _) = server().await;
    let response = server.get("/reputation/me/history").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_history_lists_own_events() {
    let (server, harness) = server().await;
    let user = harness.user().await;
    harness
        .ledger
        .append_event(user, EventType::Penalty, Reason::Spam, -2.0, None)
        .await
        .unwrap();

    let response = as_user(server.get("/reputation/me/history?limit=10"), user).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["events"][0]["type"], "penalty");
    assert_eq!(body["events"][0]["scoreAfter"], 68.0);
}

#[tokio::test]
async fn test_analyze_returns_warnings_without_side_effects() {
    let (server, harness) = server().await;
    let user = harness.user().await;

    let response = as_user(server.post("/reputation/analyze"), user)
        .json(&json!({ "content": "you idiot" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["hasIssues"], true);
    assert_eq!(body["suggestedPenalty"], -9.0);
    assert_eq!(body["warnings"].as_array().unwrap().len(), 2);

    let history = harness.ledger.history(user, 10, 0).await.unwrap();
    assert_eq!(history.total, 0);
}

#[tokio::test]
async fn test_analyze_rate_limited() {
    let harness = Harness::with_settings(
        classifier(),
        repute::config::Settings {
            analyze_rate_limit_per_minute: 1,
            ..repute::config::Settings::default()
        },
    )
    .await;
    let server = TestServer::new(router(harness.state.clone())).unwrap();
    let user = harness.user().await;

    as_user(server.post("/reputation/analyze"), user)
        .json(&json!({ "content": "hello" }))
        .await
        .assert_status_ok();
    let response = as_user(server.post("/reputation/analyze"), user)
        .json(&json!({ "content": "hello again" }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_some());
}

#[tokio::test]
async fn test_post_anyway_penalizes_once() {
    let (server, harness) = server().await;
    let user = harness.user().await;
    let post_id = Uuid::new_v4();

    for _ in 0..2 {
        let response = as_user(server.post("/reputation/penalty"), user)
            .json(&json!({ "postId": post_id, "content": "buy now" }))
            .await;
        response.assert_status_ok();
    }

    let history = harness.ledger.history(user, 10, 0).await.unwrap();
    assert_eq!(history.total, 1);
    assert_eq!(history.events[0].reason, Reason::Spam);
}

#[tokio::test]
async fn test_report_validated() {
    let (server, harness) = server().await;
    let author = harness.user().await;
    let reporter = harness.user().await;
    let post_id = harness.post(author, "buy now, limited offer").await;

    let response = as_user(server.post("/reputation/report"), reporter)
        .json(&json!({
            "targetUserId": author,
            "postId": post_id,
            "reason": "advertising",
            "content": "buy now, limited offer"
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "validated");
    assert_eq!(body["penalty"]["points"], -2.0);
}

#[tokio::test]
async fn test_self_report_is_bad_request() {
    let (server, harness) = server().await;
    let author = harness.user().await;
    let post_id = harness.post(author, "buy now").await;

    let response = as_user(server.post("/reputation/report"), author)
        .json(&json!({
            "targetUserId": author,
            "postId": post_id,
            "reason": "spam",
            "content": "buy now"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_appeal_accepted() {
    let (server, harness) = server().await;
    let author = harness.user().await;
    let post_id = harness.post(author, "a perfectly fine post").await;
    let event = harness
        .ledger
        .append_event(author, EventType::Penalty, Reason::Spam, -2.0, Some(post_id))
        .await
        .unwrap()
        .into_event()
        .unwrap();

    let response = as_user(server.post("/reputation/appeal"), author)
        .json(&json!({ "eventId": event.id, "reason": "this was not spam" }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["status"], "ai_review");

    let again = as_user(server.post("/reputation/appeal"), author)
        .json(&json!({ "eventId": event.id, "reason": "again" }))
        .await;
    again.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let (server, harness) = server().await;
    let user = harness.user().await;

    as_user(server.get("/reputation/stats"), user)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .get("/reputation/stats")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    as_admin(server.get("/reputation/stats"), Uuid::new_v4())
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_admin_award_bypasses_daily_cap() {
    let (server, harness) = server().await;
    let user = harness.user().await;
    let admin = Uuid::new_v4();

    let response = as_admin(server.post("/reputation/award"), admin)
        .json(&json!({ "userId": user, "points": 5.0, "note": "community helper" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["outcome"], "recorded");
    assert_eq!(body["event"]["points"], 5.0);

    let summary = harness.ledger.summary(user).await.unwrap();
    assert_eq!(summary.score, 75);
}

#[tokio::test]
async fn test_low_reputation_listing() {
    let (server, harness) = server().await;
    let user = harness.user().await;
    for _ in 0..5 {
        harness
            .ledger
            .append_event(user, EventType::Penalty, Reason::HateSpeech, -10.0, None)
            .await
            .unwrap();
    }

    let response = as_admin(server.get("/reputation/low-reputation"), Uuid::new_v4()).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["tier"], "restricted");
}

#[tokio::test]
async fn test_feed_rejects_bad_weights() {
    let (server, harness) = server().await;
    let viewer = harness.user().await;
    let weights = encode_query_json(r#"{"recency":0.5,"similarity":0.3,"social":0.2,"trending":0.05}"#);

    let response = as_user(
        server.get(&format!("/feed?pageSize=5&weights={weights}")),
        viewer,
    )
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feed_seeded_pages_repeat() {
    let (server, harness) = server().await;
    let viewer = harness.user().await;
    for i in 0..8 {
        let author = harness.user().await;
        harness.post(author, &format!("post number {i}")).await;
    }
    let weights = encode_query_json(r#"{"recency":0.25,"similarity":0.25,"social":0.25,"trending":0.25}"#);
    let url = format!("/feed?pageSize=4&seed=11&weights={weights}");

    let first: Value = as_user(server.get(&url), viewer).await.json();
    let second: Value = as_user(server.get(&url), viewer).await.json();
    assert_eq!(first["postIds"], second["postIds"]);
    assert_eq!(first["postIds"].as_array().unwrap().len(), 4);
    assert_eq!(first["seed"], "11");
    assert_eq!(first["stats"]["candidateCount"], 8);
}

#[tokio::test]
async fn test_feed_returns_replayable_string_seed() {
    let (server, harness) = server().await;
    let viewer = harness.user().await;
    for i in 0..6 {
        let author = harness.user().await;
        harness.post(author, &format!("post number {i}")).await;
    }

    let first: Value = as_user(server.get("/feed?pageSize=3"), viewer).await.json();
    let seed = first["seed"].as_str().unwrap().to_string();
    assert!(seed.parse::<u64>().is_ok());

    let replayed: Value = as_user(server.get(&format!("/feed?pageSize=3&seed={seed}")), viewer)
        .await
        .json();
    assert_eq!(first["postIds"], replayed["postIds"]);

    let large: Value = as_user(server.get("/feed?pageSize=3&seed=18446744073709551557"), viewer)
        .await
        .json();
    assert_eq!(large["seed"], "18446744073709551557");
}

#[tokio::test]
async fn test_feed_page_size_out_of_range() {
    let (server, harness) = server().await;
    let viewer = harness.user().await;
    as_user(server.get("/feed?pageSize=0"), viewer)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    as_user(server.get("/feed?pageSize=101"), viewer)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
