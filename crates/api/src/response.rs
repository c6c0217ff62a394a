//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use billing_core::{
    Feedback, GatewayReceipt, ReceiptKind, ResourceRef, SessionRecord, SessionStatus,
    SessionSummary,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

/// POST /session/start
#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub lock_reference: String,
    pub locked_amount: Decimal,
    pub rate_per_minute: Decimal,
    pub lock_ceiling_minutes: u32,
    pub resource: ResourceRef,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
}

impl From<SessionRecord> for StartSessionResponse {
    fn from(record: SessionRecord) -> Self {
        Self {
            status: record.status(),
            session_id: record.session_id.to_string(),
            lock_reference: record.lock_reference,
            locked_amount: record.terms.locked_amount,
            rate_per_minute: record.terms.rate_per_minute,
            lock_ceiling_minutes: record.terms.lock_ceiling_minutes,
            resource: record.resource,
            started_at: record.started_at,
        }
    }
}

/// POST /session/end and POST /session/cancel
///
/// `confirmed = false` is a degraded success: the session is terminal but
/// the gateway did not confirm the settlement or refund.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummaryResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub elapsed_seconds: u64,
    pub elapsed_minutes: Decimal,
    pub locked_amount: Decimal,
    pub amount_charged: Decimal,
    pub amount_refunded: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub confirmed: bool,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_error: Option<String>,
    pub recoverable: bool,
}

impl From<SessionSummary> for SessionSummaryResponse {
    fn from(summary: SessionSummary) -> Self {
        let degraded = summary.is_degraded();
        let GatewayReceipt {
            kind,
            confirmation_id,
            confirmed,
            recoverable,
            error,
            ..
        } = summary.receipt;

        let (settlement_id, refund_id) = match kind {
            ReceiptKind::Settlement => (confirmation_id, None),
            ReceiptKind::Refund => (None, confirmation_id),
        };

        Self {
            session_id: summary.session_id.to_string(),
            status: summary.status,
            elapsed_seconds: summary.elapsed_seconds,
            elapsed_minutes: summary.elapsed_minutes,
            locked_amount: summary.locked_amount,
            amount_charged: summary.amount_charged,
            amount_refunded: summary.amount_refunded,
            settlement_id,
            refund_id,
            reason: summary.reason,
            confirmed,
            degraded,
            gateway_error: error,
            recoverable,
        }
    }
}

/// A quiz score with its 1-based position in the session.
#[derive(Debug, Serialize, Deserialize)]
pub struct NumberedQuizScore {
    pub number: usize,
    pub score: u32,
    pub total: u32,
    pub position_secs: u32,
    pub recorded_at: DateTime<Utc>,
}

/// GET /session/{id}
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDetailResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub resource: ResourceRef,
    pub payer: String,
    pub lock_reference: String,
    pub rate_per_minute: Decimal,
    pub lock_ceiling_minutes: u32,
    pub locked_amount: Decimal,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub amount_charged: Option<Decimal>,
    pub amount_refunded: Option<Decimal>,
    pub reason: Option<String>,
    pub receipt: Option<GatewayReceipt>,
    pub quiz_scores: Vec<NumberedQuizScore>,
    pub feedback: Option<Feedback>,
}

impl From<SessionRecord> for SessionDetailResponse {
    fn from(record: SessionRecord) -> Self {
        let closure = record.state.closure().cloned();
        let quiz_scores = record
            .quiz_scores
            .iter()
            .enumerate()
            .map(|(i, q)| NumberedQuizScore {
                number: i + 1,
                score: q.score,
                total: q.total,
                position_secs: q.position_secs,
                recorded_at: q.recorded_at,
            })
            .collect();

        Self {
            session_id: record.session_id.to_string(),
            status: record.status(),
            ended_at: record.ended_at(),
            resource: record.resource,
            payer: record.payer,
            lock_reference: record.lock_reference,
            rate_per_minute: record.terms.rate_per_minute,
            lock_ceiling_minutes: record.terms.lock_ceiling_minutes,
            locked_amount: record.terms.locked_amount,
            started_at: record.started_at,
            amount_charged: closure.as_ref().map(|c| c.amount_charged),
            amount_refunded: closure.as_ref().map(|c| c.amount_refunded),
            reason: closure.and_then(|c| c.reason),
            receipt: record.receipt,
            quiz_scores,
            feedback: record.feedback,
        }
    }
}

/// Acknowledgement for side-data writes.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_number: Option<usize>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            quiz_number: None,
        }
    }

    pub fn quiz(number: usize) -> Self {
        Self {
            success: true,
            quiz_number: Some(number),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub gateway_connected: bool,
    pub store_connected: bool,
    pub store_backend: String,
    pub active_sessions: u64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error carrying the coded error body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn validation(errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", "VALID_001").with_details(errors),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<billing_core::Error> for ApiError {
    fn from(err: billing_core::Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server-side failures are logged in full and reported generically.
        let message = if status.is_server_error() && !matches!(
            err,
            billing_core::Error::FundLockFailed { .. }
                | billing_core::Error::Gateway(_)
                | billing_core::Error::GatewayTimeout(_)
        ) {
            error!(code = err.error_code(), error = %err, "Request failed");
            "Internal error".to_string()
        } else {
            err.to_string()
        };

        let mut api_error = ApiError::with_code(status, err.error_code(), message);
        if let billing_core::Error::FundLockFailed { session_id, .. } = &err {
            api_error.response.details = Some(vec![format!("session_id: {}", session_id)]);
        }
        api_error
    }
}
