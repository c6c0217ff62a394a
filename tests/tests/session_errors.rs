//! Error responses for the session endpoints.
//!
//! Each failure must come back with the right status and error code and
//! leave the gateway untouched.

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use billing_engine::BillingConfig;
use integration_tests::{
    fixtures::{self, text},
    setup::TestContext,
};
use payment_gateway::GatewayError;
use serde_json::{json, Value};

#[tokio::test]
async fn test_unknown_session_returns_404() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/session/status/sess_missing").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "SESSION_001");

    let response = server
        .post("/session/end")
        .json(&fixtures::end_session("sess_missing"))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .post("/session/cancel")
        .json(&fixtures::cancel_session("sess_missing", None))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .post("/session/sess_missing/feedback")
        .json(&json!({ "stars": 4 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    assert_eq!(ctx.gateway.release_count(), 0);
}

#[tokio::test]
async fn test_cancel_after_end_returns_409() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started: Value = server
        .post("/session/start")
        .json(&fixtures::teaching_session("0.50"))
        .await
        .json();
    let session_id = text(&started, "session_id").to_string();
    ctx.advance_secs(60);

    server
        .post("/session/end")
        .json(&fixtures::end_session(&session_id))
        .await
        .assert_status_ok();

    let response = server
        .post("/session/cancel")
        .json(&fixtures::cancel_session(&session_id, None))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "SESSION_002");

    assert_eq!(ctx.gateway.settlements().len(), 1);
    assert!(ctx.gateway.refunds().is_empty());
}

#[tokio::test]
async fn test_start_validation_errors() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let cases = [
        // No pricing at all
        json!({ "resource_id": "guitar-basics", "payer": "student-1" }),
        // Budget without a duration
        json!({ "resource_id": "guitar-basics", "payer": "student-1", "locked_amount": 10 }),
        // Empty resource id
        json!({ "resource_id": "", "payer": "student-1", "rate_per_minute": 1 }),
        // Ceiling out of range
        json!({
            "resource_id": "guitar-basics",
            "payer": "student-1",
            "rate_per_minute": 1,
            "lock_ceiling_minutes": 0
        }),
    ];

    for body in cases {
        let response = server.post("/session/start").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: Value = response.json();
        assert_eq!(error["code"], "VALID_001", "body: {}", body);
    }

    assert!(ctx.gateway.locks().is_empty());
}

#[tokio::test]
async fn test_non_positive_rate_rejected_before_lock() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    for rate in ["0", "-0.50"] {
        let response = server
            .post("/session/start")
            .json(&fixtures::teaching_session(rate))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    assert!(ctx.gateway.locks().is_empty());
    assert!(ctx.store.is_empty());
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/session/end")
        .content_type("application/json")
        .bytes("{ \"session_id\": ".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

#[tokio::test]
async fn test_side_data_validation() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started: Value = server
        .post("/session/start")
        .json(&fixtures::video_session("0.20", 30))
        .await
        .json();
    let session_id = text(&started, "session_id").to_string();

    // Score above total
    let response = server
        .post(&format!("/session/{}/quiz-score", session_id))
        .json(&json!({ "score": 4, "total": 3 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Zero stars
    let response = server
        .post(&format!("/session/{}/feedback", session_id))
        .json(&json!({ "stars": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert!(body["details"].is_array());
}

#[tokio::test]
async fn test_ledger_limit_out_of_range() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/ledger/entries").add_query_param("limit", 0).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.get("/ledger/entries").add_query_param("limit", 500).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lock_timeout_is_reported_as_lock_failure() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ctx.gateway.set_lock_failure(Some(GatewayError::Timeout(30_000)));

    let response = server
        .post("/session/start")
        .json(&fixtures::teaching_session("0.50"))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["code"], "PAY_001");
    assert!(ctx.store.is_empty());
}

fn short_gateway_timeout() -> BillingConfig {
    BillingConfig {
        gateway_call_timeout_ms: 50,
        ..BillingConfig::default()
    }
}

#[tokio::test]
async fn test_slow_lock_is_cut_off_by_call_timeout() {
    let ctx = TestContext::with_config(short_gateway_timeout());
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ctx.gateway.set_lock_delay(Some(Duration::from_millis(500)));

    let response = server
        .post("/session/start")
        .json(&fixtures::teaching_session("0.50"))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["code"], "PAY_001");
    assert!(ctx.store.is_empty());
    assert!(ctx.gateway.refunds().is_empty());
}

#[tokio::test]
async fn test_slow_settlement_is_cut_off_into_degraded_completion() {
    let ctx = TestContext::with_config(short_gateway_timeout());
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let started: Value = server
        .post("/session/start")
        .json(&fixtures::teaching_session("0.50"))
        .await
        .json();
    let session_id = text(&started, "session_id").to_string();
    ctx.advance_secs(300);
    ctx.gateway.set_settle_delay(Some(Duration::from_millis(500)));

    let response = server
        .post("/session/end")
        .json(&fixtures::end_session(&session_id))
        .await;
    response.assert_status_ok();
    let summary: Value = response.json();

    assert_eq!(text(&summary, "status"), "completed");
    assert_eq!(summary["confirmed"], false);
    assert_eq!(summary["degraded"], true);
    assert_eq!(summary["recoverable"], true);
    assert!(text(&summary, "gateway_error").contains("timed out after 50ms"));

    let status: Value = server
        .get(&format!("/session/status/{}", session_id))
        .await
        .json();
    assert_eq!(text(&status, "status"), "completed");
}
