//! Request bodies.
//!
//! Length and range limits mirror `billing_core::limits`; the derive macro
//! needs literals.

use billing_core::{ResourceKind, ResourceRef};
use billing_engine::{PricingTerms, StartSession};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::response::ApiError;

/// POST /session/start
///
/// Pricing is either `rate_per_minute` (with an optional ceiling) or a
/// `locked_amount` budget spread over `lock_ceiling_minutes`.
///
/// The resource is named by exactly one of `resource_id`, `teacher_id` or
/// `video_id`. The legacy names imply the kind; a bare `resource_id`
/// without `resource_kind` is a teaching session.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_start"))]
pub struct StartSessionRequest {
    #[serde(default)]
    pub resource_kind: Option<ResourceKind>,
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub resource_id: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub teacher_id: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub video_id: Option<String>,
    #[serde(alias = "student_id", alias = "user_id")]
    #[validate(length(min = 1, max = 128))]
    pub payer: String,
    #[serde(default, alias = "rate_per_unit_time")]
    pub rate_per_minute: Option<Decimal>,
    #[serde(default)]
    pub locked_amount: Option<Decimal>,
    #[serde(default, alias = "duration_minutes")]
    #[validate(range(min = 1, max = 480))]
    pub lock_ceiling_minutes: Option<u32>,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub description: Option<String>,
}

fn validate_start(req: &StartSessionRequest) -> Result<(), ValidationError> {
    req.resource()?;
    validate_pricing(req)
}

fn validate_pricing(req: &StartSessionRequest) -> Result<(), ValidationError> {
    match (req.rate_per_minute, req.locked_amount, req.lock_ceiling_minutes) {
        (Some(_), None, _) => Ok(()),
        (None, Some(_), Some(_)) => Ok(()),
        (None, Some(_), None) => Err(invalid(
            "pricing",
            "locked_amount requires lock_ceiling_minutes",
        )),
        (Some(_), Some(_), _) => Err(invalid(
            "pricing",
            "give either rate_per_minute or locked_amount, not both",
        )),
        (None, None, _) => Err(invalid(
            "pricing",
            "rate_per_minute or locked_amount is required",
        )),
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

impl StartSessionRequest {
    /// Resolves the resource reference from whichever id field was sent.
    pub fn resource(&self) -> Result<ResourceRef, ValidationError> {
        let (id, implied) = match (&self.resource_id, &self.teacher_id, &self.video_id) {
            (Some(id), None, None) => (id, None),
            (None, Some(id), None) => (id, Some(ResourceKind::Teaching)),
            (None, None, Some(id)) => (id, Some(ResourceKind::Video)),
            (None, None, None) => return Err(invalid("resource", "resource_id is required")),
            _ => {
                return Err(invalid(
                    "resource",
                    "give only one of resource_id, teacher_id or video_id",
                ))
            }
        };

        let kind = match (self.resource_kind, implied) {
            (Some(kind), Some(implied)) if kind != implied => {
                return Err(invalid(
                    "resource",
                    "resource_kind does not match the id field",
                ))
            }
            (Some(kind), _) => kind,
            (None, Some(implied)) => implied,
            (None, None) => ResourceKind::Teaching,
        };

        Ok(ResourceRef {
            kind,
            id: id.clone(),
        })
    }

    pub fn into_command(self) -> Result<StartSession, ApiError> {
        let resource = self.resource().map_err(|e| {
            ApiError::bad_request(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "invalid resource".to_string()),
            )
        })?;

        let pricing = match (self.rate_per_minute, self.locked_amount, self.lock_ceiling_minutes) {
            (Some(rate_per_minute), None, lock_ceiling_minutes) => PricingTerms::Rate {
                rate_per_minute,
                lock_ceiling_minutes,
            },
            (None, Some(locked_amount), Some(duration_minutes)) => PricingTerms::Budget {
                locked_amount,
                duration_minutes,
            },
            _ => return Err(ApiError::bad_request("invalid pricing terms")),
        };

        Ok(StartSession {
            resource,
            payer: self.payer,
            pricing,
            description: self.description,
        })
    }
}

/// POST /session/end
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EndSessionRequest {
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
}

/// POST /session/cancel
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelSessionRequest {
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub reason: Option<String>,
}

/// POST /session/{id}/quiz-score
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuizScoreRequest {
    pub score: u32,
    #[validate(range(min = 1))]
    pub total: u32,
    #[serde(default, alias = "video_time")]
    pub position_secs: u32,
}

/// POST /session/{id}/feedback
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[serde(alias = "rating")]
    #[validate(range(min = 1, max = 5))]
    pub stars: u8,
    #[serde(default, alias = "review")]
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// GET /ledger/entries
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerQuery {
    #[serde(default = "default_ledger_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_ledger_limit() -> u32 {
    20
}
