//! End-to-end session lifecycle over HTTP.
//!
//! Runs the real router and engine against `MockGateway` and an in-memory
//! store. Time is driven by a manual clock, so charges are exact.

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{
    fixtures::{self, money, text},
    mocks::settled_total,
    setup::TestContext,
};
use payment_gateway::GatewayError;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn start(server: &TestServer, body: Value) -> Value {
    let response = server.post("/session/start").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

/// 5 minutes at 0.50/min against a 30 minute lock
#[tokio::test]
async fn test_end_charges_elapsed_minutes() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::teaching_session("0.50")).await;
    let session_id = text(&started, "session_id").to_string();
    assert_eq!(money(&started, "locked_amount"), dec!(15.00));
    assert_eq!(text(&started, "status"), "active");
    assert_eq!(started["lock_ceiling_minutes"], 30);

    let locks = ctx.gateway.locks();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].amount, dec!(15.00));
    assert_eq!(locks[0].reference, session_id);
    assert_eq!(locks[0].payer, "student-1");

    ctx.advance_secs(300);

    let response = server
        .post("/session/end")
        .json(&fixtures::end_session(&session_id))
        .await;
    response.assert_status_ok();
    let summary: Value = response.json();

    assert_eq!(text(&summary, "status"), "completed");
    assert_eq!(summary["elapsed_seconds"], 300);
    assert_eq!(money(&summary, "amount_charged"), dec!(2.50));
    assert_eq!(money(&summary, "amount_refunded"), dec!(12.50));
    assert_eq!(summary["confirmed"], true);
    assert_eq!(summary["degraded"], false);
    assert!(summary["settlement_id"].is_string());

    let settlements = ctx.gateway.settlements();
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].amount, dec!(2.50));
    assert_eq!(settlements[0].lock_reference, text(&started, "lock_reference"));
    assert!(settlements[0].proof.proof_uri.ends_with(&session_id));
    assert!(ctx.gateway.refunds().is_empty());
}

/// Running past the ceiling charges exactly the lock
#[tokio::test]
async fn test_overrun_is_capped_at_lock() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::teaching_session("0.5")).await;
    let session_id = text(&started, "session_id").to_string();

    ctx.advance_secs(1900);

    // The live estimate is not capped
    let response = server.get(&format!("/session/status/{}", session_id)).await;
    response.assert_status_ok();
    let status: Value = response.json();
    assert_eq!(text(&status, "status"), "active");
    assert_eq!(status["elapsed_seconds"], 1900);
    assert_eq!(money(&status, "amount_charged_estimate"), dec!(15.83));

    let response = server
        .post("/session/end")
        .json(&fixtures::end_session(&session_id))
        .await;
    response.assert_status_ok();
    let summary: Value = response.json();

    assert_eq!(money(&summary, "amount_charged"), dec!(15.00));
    assert_eq!(money(&summary, "amount_refunded"), dec!(0.00));
    assert_eq!(settled_total(&ctx.gateway), dec!(15.00));
}

#[tokio::test]
async fn test_immediate_cancel_refunds_everything() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::teaching_session("0.50")).await;
    let session_id = text(&started, "session_id").to_string();

    let response = server
        .post("/session/cancel")
        .json(&fixtures::cancel_session(&session_id, None))
        .await;
    response.assert_status_ok();
    let summary: Value = response.json();

    assert_eq!(text(&summary, "status"), "cancelled");
    assert_eq!(money(&summary, "amount_charged"), dec!(0.00));
    assert_eq!(money(&summary, "amount_refunded"), dec!(15.00));
    assert_eq!(text(&summary, "reason"), "user_cancelled");
    assert!(summary["refund_id"].is_string());

    let refunds = ctx.gateway.refunds();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, dec!(15.00));
    assert!(ctx.gateway.settlements().is_empty());
}

/// Cancelling after some minutes still refunds the whole lock
#[tokio::test]
async fn test_late_cancel_keeps_reason() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::video_session("1.20", 10)).await;
    let session_id = text(&started, "session_id").to_string();
    assert_eq!(money(&started, "locked_amount"), dec!(12.00));

    ctx.advance_secs(240);

    let response = server
        .post("/session/cancel")
        .json(&fixtures::cancel_session(&session_id, Some("teacher_no_show")))
        .await;
    response.assert_status_ok();
    let summary: Value = response.json();

    assert_eq!(money(&summary, "amount_refunded"), dec!(12.00));
    assert_eq!(text(&summary, "reason"), "teacher_no_show");
    assert_eq!(ctx.gateway.refunds()[0].reason, "teacher_no_show");
}

/// Two concurrent ends: one settlement, one conflict
#[tokio::test]
async fn test_concurrent_end_settles_once() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::teaching_session("0.50")).await;
    let session_id = text(&started, "session_id").to_string();
    ctx.advance_secs(600);

    // Keep the winner inside the gateway call while the loser arrives
    ctx.gateway.set_settle_delay(Some(Duration::from_millis(50)));

    let body = fixtures::end_session(&session_id);
    let end = || async { server.post("/session/end").json(&body).await };
    let (first, second) = tokio::join!(end(), end());

    let mut statuses = vec![first.status_code(), second.status_code()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    let loser: Value = if first.status_code() == StatusCode::CONFLICT {
        first.json()
    } else {
        second.json()
    };
    assert_eq!(loser["code"], "SESSION_002");

    assert_eq!(ctx.gateway.settlements().len(), 1);
    assert_eq!(ctx.gateway.release_count(), 1);
}

/// End racing cancel: exactly one of settle or refund happens
#[tokio::test]
async fn test_end_and_cancel_race_releases_once() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::teaching_session("0.50")).await;
    let session_id = text(&started, "session_id").to_string();
    ctx.advance_secs(60);

    let end = async {
        server
            .post("/session/end")
            .json(&fixtures::end_session(&session_id))
            .await
    };
    let cancel = async {
        server
            .post("/session/cancel")
            .json(&fixtures::cancel_session(&session_id, None))
            .await
    };
    let (ended, cancelled) = tokio::join!(end, cancel);

    let ok = [ended.status_code(), cancelled.status_code()]
        .iter()
        .filter(|s| **s == StatusCode::OK)
        .count();
    assert_eq!(ok, 1);
    assert_eq!(ctx.gateway.release_count(), 1);
}

/// A failed lock leaves nothing behind
#[tokio::test]
async fn test_failed_lock_leaves_no_session() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ctx.gateway.set_lock_failure(Some(GatewayError::Rejected {
        status: 402,
        body: "insufficient balance".to_string(),
    }));

    let response = server
        .post("/session/start")
        .json(&fixtures::teaching_session("0.50"))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["code"], "PAY_001");

    let detail = body["details"][0].as_str().expect("session id detail");
    let session_id = detail
        .strip_prefix("session_id: ")
        .expect("detail names the session");

    let response = server.get(&format!("/session/status/{}", session_id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(ctx.store.is_empty());
}

/// Settlement failure after close: terminal, reported as degraded
#[tokio::test]
async fn test_settlement_failure_is_degraded_success() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::teaching_session("0.50")).await;
    let session_id = text(&started, "session_id").to_string();
    ctx.advance_secs(120);

    ctx.gateway
        .set_settle_failure(Some(GatewayError::Unavailable("delivery-proof".to_string())));

    let response = server
        .post("/session/end")
        .json(&fixtures::end_session(&session_id))
        .await;
    response.assert_status_ok();
    let summary: Value = response.json();

    assert_eq!(text(&summary, "status"), "completed");
    assert_eq!(money(&summary, "amount_charged"), dec!(1.00));
    assert_eq!(summary["confirmed"], false);
    assert_eq!(summary["degraded"], true);
    assert_eq!(summary["recoverable"], true);
    assert!(summary["gateway_error"].is_string());

    // Stays terminal; a retry does not reach the gateway again
    let response = server
        .post("/session/end")
        .json(&fixtures::end_session(&session_id))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(ctx.gateway.settlements().len(), 1);

    let detail: Value = server
        .get(&format!("/session/{}", session_id))
        .await
        .json();
    assert_eq!(detail["receipt"]["confirmed"], false);
}

#[tokio::test]
async fn test_refund_failure_is_degraded_success() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::teaching_session("0.50")).await;
    let session_id = text(&started, "session_id").to_string();

    ctx.gateway.set_refund_failure(Some(GatewayError::Rejected {
        status: 400,
        body: "escrow already released".to_string(),
    }));

    let response = server
        .post("/session/cancel")
        .json(&fixtures::cancel_session(&session_id, None))
        .await;
    response.assert_status_ok();
    let summary: Value = response.json();

    assert_eq!(text(&summary, "status"), "cancelled");
    assert_eq!(summary["degraded"], true);
    assert_eq!(summary["recoverable"], false);
}

/// `video_id` alone gets the video ceiling, not the teaching one
#[tokio::test]
async fn test_legacy_video_body_uses_video_ceiling() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::legacy_video_session("0.20")).await;
    assert_eq!(started["resource"]["kind"], "video");
    assert_eq!(started["resource"]["id"], "intro-to-sql");
    assert_eq!(started["lock_ceiling_minutes"], 60);
    assert_eq!(money(&started, "locked_amount"), dec!(12.00));
    assert_eq!(ctx.gateway.locks()[0].amount, dec!(12.00));

    // Kind and id field disagree
    let response = server
        .post("/session/start")
        .json(&json!({
            "resource_kind": "teaching",
            "video_id": "intro-to-sql",
            "payer": "student-2",
            "rate_per_minute": "0.20"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(ctx.gateway.locks().len(), 1);
}

/// Status after end reports the final charge, not a running estimate
#[tokio::test]
async fn test_status_is_frozen_after_end() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::legacy_teaching_session("1")).await;
    let session_id = text(&started, "session_id").to_string();
    ctx.advance_secs(90);

    server
        .post("/session/end")
        .json(&fixtures::end_session(&session_id))
        .await
        .assert_status_ok();

    ctx.advance_secs(3000);

    let status: Value = server
        .get(&format!("/session/status/{}", session_id))
        .await
        .json();
    assert_eq!(text(&status, "status"), "completed");
    assert_eq!(status["elapsed_seconds"], 90);
    assert_eq!(money(&status, "amount_charged_estimate"), dec!(1.50));
    assert!(status["ended_at"].is_string());
}

#[tokio::test]
async fn test_quiz_scores_and_feedback_in_detail() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::video_session("0.20", 45)).await;
    let session_id = text(&started, "session_id").to_string();

    for (score, video_time) in [(2, 120), (3, 480)] {
        let response = server
            .post(&format!("/session/{}/quiz-score", session_id))
            .json(&json!({ "score": score, "total": 3, "video_time": video_time }))
            .await;
        response.assert_status_ok();
    }

    ctx.advance_secs(600);
    server
        .post("/session/end")
        .json(&fixtures::end_session(&session_id))
        .await
        .assert_status_ok();

    // Feedback usually arrives after the session is over
    let response = server
        .post(&format!("/session/{}/feedback", session_id))
        .json(&json!({ "rating": 5, "review": "Great pacing" }))
        .await;
    response.assert_status_ok();
    let ack: Value = response.json();
    assert_eq!(ack["success"], true);

    let detail: Value = server
        .get(&format!("/session/{}", session_id))
        .await
        .json();

    assert_eq!(text(&detail, "status"), "completed");
    assert_eq!(detail["resource"]["kind"], "video");
    assert_eq!(detail["quiz_scores"].as_array().map(Vec::len), Some(2));
    assert_eq!(detail["quiz_scores"][1]["number"], 2);
    assert_eq!(detail["quiz_scores"][1]["position_secs"], 480);
    assert_eq!(detail["feedback"]["stars"], 5);
    assert_eq!(detail["feedback"]["comment"], "Great pacing");
    assert_eq!(money(&detail, "amount_charged"), dec!(2.00));
}

#[tokio::test]
async fn test_quiz_score_numbering_is_returned() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started = start(&server, fixtures::video_session("0.20", 45)).await;
    let session_id = text(&started, "session_id").to_string();

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let ack: Value = server
            .post(&format!("/session/{}/quiz-score", session_id))
            .json(&json!({ "score": 1, "total": 1 }))
            .await
            .json();
        numbers.push(ack["quiz_number"].as_u64().unwrap_or_default());
    }
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_wallet_pass_through() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/wallet/balance").await;
    response.assert_status_ok();
    let balance: Value = response.json();
    assert_eq!(balance["data"]["available"], "250.00");

    let response = server.get("/escrow/intent_0001").await;
    response.assert_status_ok();
    let escrow: Value = response.json();
    assert_eq!(escrow["data"]["paymentIntentId"], "intent_0001");

    let response = server
        .get("/ledger/entries")
        .add_query_param("limit", 5)
        .add_query_param("offset", 10)
        .await;
    response.assert_status_ok();
    let ledger: Value = response.json();
    assert_eq!(ledger["limit"], 5);
    assert_eq!(ledger["offset"], 10);
}
