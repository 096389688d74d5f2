use repute::app::AppState;
use repute::config::Settings;
use repute::domain::{AppealOutcome, AppealStatus, AppendOutcome, EventType, Reason};
use repute::error::RepError;
use repute::reputation::{CommunityReport, ReportStatus};
use repute::test_support::{Harness, MockClassifier};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reports_yield_one_penalty() {
    let harness = Harness::new(MockClassifier::new().with_rule("hateful", &[("hate_speech", 0.97)])).await;
    let author = harness.user().await;
    let post_id = harness.post(author, "something hateful").await;

    let mut reporters = Vec::new();
    for _ in 0..10 {
        reporters.push(harness.user().await);
    }

    let handles: Vec<_> = reporters
        .iter()
        .map(|&reporter| {
            let penalties = harness.penalties.clone();
            tokio::spawn(async move {
                penalties
                    .submit_report(
                        reporter,
                        CommunityReport {
                            target_user_id: author,
                            post_id,
                            reason: "this is hate speech".into(),
                            content: String::new(),
                        },
                    )
                    .await
            })
        })
        .collect();

    let mut duplicates = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.status, ReportStatus::Validated);
        if outcome.duplicate {
            duplicates += 1;
        }
    }
    assert_eq!(duplicates, 9);

    let history = harness.ledger.history(author, 50, 0).await.unwrap();
    assert_eq!(history.total, 1);
    assert_eq!(history.events[0].points, -10.0);
    assert_eq!(harness.ledger.current_score(author).await.unwrap().as_int(), 60);

    let mut rewarded = 0;
    for reporter in reporters {
        if harness.ledger.current_score(reporter).await.unwrap().value() > 70.0 {
            rewarded += 1;
        }
    }
    assert_eq!(rewarded, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rewards_respect_daily_cap() {
    let harness = Harness::new(MockClassifier::new()).await;
    let user = harness.user().await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = harness.ledger.clone();
            tokio::spawn(async move {
                ledger
                    .append_event(user, EventType::Reward, Reason::QualityPost, 1.5, None)
                    .await
            })
        })
        .collect();

    let mut dropped = 0;
    for handle in handles {
        if matches!(handle.await.unwrap().unwrap(), AppendOutcome::Dropped { .. }) {
            dropped += 1;
        }
    }
    assert_eq!(dropped, 6);

    let events = harness.ledger.history(user, 50, 0).await.unwrap().events;
    let total: f64 = events.iter().map(|e| e.points).sum();
    assert_eq!(events.len(), 2);
    assert!((total - 2.0).abs() < 1e-9, "capped total {total}");
    assert!((harness.ledger.current_score(user).await.unwrap().value() - 72.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_appeal_overturn_compensates_and_keeps_original() {
    let harness = Harness::new(MockClassifier::new().with_rule("sarcasm", &[("harassment", 0.08)])).await;
    let author = harness.user().await;
    let post_id = harness.post(author, "obvious sarcasm").await;
    let penalty = harness
        .ledger
        .append_event(author, EventType::Penalty, Reason::Harassment, -8.0, Some(post_id))
        .await
        .unwrap()
        .into_event()
        .unwrap();

    let record = harness
        .appeals
        .submit(author, penalty.id, "it was sarcasm aimed at myself")
        .await
        .unwrap();
    assert_eq!(record.status, AppealStatus::AiReview);

    let mut resolved = None;
    for _ in 0..100 {
        let current = harness.appeals.get(record.id).await.unwrap();
        if current.is_terminal() {
            resolved = Some(current);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let resolved = resolved.expect("appeal should resolve");
    assert_eq!(resolved.outcome, AppealOutcome::Overturned);
    assert!((resolved.confidence_score.unwrap() - 0.92).abs() < 1e-9);

    let original = harness.ledger.event(penalty.id).await.unwrap();
    assert_eq!(original, penalty);

    let history = harness.ledger.history(author, 10, 0).await.unwrap();
    let compensation = &history.events[0];
    assert_eq!(compensation.reason, Reason::AppealOverturned);
    assert!((compensation.points - 9.6).abs() < 1e-9);
    assert_eq!(
        compensation.note.as_deref(),
        Some(format!("appeal:{} event:{}", record.id, penalty.id).as_str())
    );
}

#[tokio::test]
async fn test_journal_replay_restores_scores() {
    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("events.jsonl");
    let seed_path = dir.path().join("seed.json");
    let user = Uuid::new_v4();
    std::fs::write(
        &seed_path,
        json!({
            "users": [{ "id": user }],
            "posts": []
        })
        .to_string(),
    )
    .unwrap();

    let settings = Settings {
        event_journal_path: Some(journal_path.clone()),
        seed_data_path: Some(seed_path),
        reward_sweep_interval: Duration::ZERO,
        ..Settings::default()
    };

    {
        let state = AppState::from_settings(&settings, CancellationToken::new())
            .await
            .unwrap();
        state
            .ledger
            .append_event(user, EventType::Penalty, Reason::Spam, -2.0, Some(Uuid::new_v4()))
            .await
            .unwrap();
        state
            .ledger
            .append_event(user, EventType::Reward, Reason::QualityPost, 0.5, None)
            .await
            .unwrap();
    }

    let restarted = AppState::from_settings(&settings, CancellationToken::new())
        .await
        .unwrap();
    let score = restarted.ledger.current_score(user).await.unwrap();
    assert!((score.value() - 68.5).abs() < 1e-9);
    assert_eq!(score, restarted.ledger.audit_score(user).await.unwrap());
    assert_eq!(restarted.ledger.history(user, 10, 0).await.unwrap().total, 2);
}

#[tokio::test]
async fn test_sweeper_runs_until_shutdown() {
    let settings = Settings {
        reward_sweep_interval: Duration::from_millis(10),
        ..Settings::default()
    };
    let token = CancellationToken::new();
    let state = AppState::from_settings(&settings, token.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    token.cancel();
    assert!(state.ledger.stats(chrono::Utc::now()).await.is_ok());
}

#[tokio::test]
async fn test_resolved_appeal_stays_resolved_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("events.jsonl");
    let seed_path = dir.path().join("seed.json");
    let user = Uuid::new_v4();
    let post_id = Uuid::new_v4();
    std::fs::write(
        &seed_path,
        json!({
            "users": [{ "id": user }],
            "posts": [{
                "id": post_id,
                "authorId": user,
                "content": "obvious sarcasm",
                "createdAt": "2025-01-01T00:00:00Z"
            }]
        })
        .to_string(),
    )
    .unwrap();

    let settings = Settings {
        event_journal_path: Some(journal_path),
        seed_data_path: Some(seed_path),
        reward_sweep_interval: Duration::ZERO,
        ..Settings::default()
    };

    let (penalty, appeal_id) = {
        let state = AppState::from_settings(&settings, CancellationToken::new())
            .await
            .unwrap();
        let penalty = state
            .ledger
            .append_event(user, EventType::Penalty, Reason::Harassment, -8.0, Some(post_id))
            .await
            .unwrap()
            .into_event()
            .unwrap();
        let record = state.appeals.open(user, penalty.id, "sarcasm").await.unwrap();
        // No classifier configured: the review escalates.
        let reviewed = state.appeals.review(record.id).await.unwrap();
        assert_eq!(reviewed.status, AppealStatus::Escalated);
        state
            .appeals
            .decide(record.id, Uuid::new_v4(), AppealOutcome::Overturned)
            .await
            .unwrap();
        let score = state.ledger.current_score(user).await.unwrap().value();
        assert!((score - 71.6).abs() < 1e-9);
        (penalty, record.id)
    };

    let restarted = AppState::from_settings(&settings, CancellationToken::new())
        .await
        .unwrap();
    let resolved = restarted.appeals.get(appeal_id).await.unwrap();
    assert_eq!(resolved.status, AppealStatus::Resolved);
    assert_eq!(resolved.outcome, AppealOutcome::Overturned);
    let err = restarted
        .appeals
        .open(user, penalty.id, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, RepError::AlreadyAppealed(id) if id == penalty.id));
    drop(restarted);

    // Even with the appeal journal gone, the ledger remembers the payout.
    std::fs::remove_file(dir.path().join("appeals.jsonl")).unwrap();
    let without_appeals = AppState::from_settings(&settings, CancellationToken::new())
        .await
        .unwrap();
    let err = without_appeals
        .appeals
        .open(user, penalty.id, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, RepError::AlreadyAppealed(_)));
    let score = without_appeals.ledger.current_score(user).await.unwrap().value();
    assert!((score - 71.6).abs() < 1e-9);
}
