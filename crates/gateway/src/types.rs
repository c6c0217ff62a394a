//! Gateway request and response types.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Reserve `amount` for a session before consumption begins.
#[derive(Debug, Clone, PartialEq)]
pub struct LockRequest {
    pub amount: Decimal,
    pub payer: String,
    /// Our session id
    pub reference: String,
    pub description: String,
    pub metadata: BTreeMap<String, String>,
}

/// A granted fund lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundLock {
    pub lock_reference: String,
    pub status: Option<String>,
}

/// Evidence that the session was delivered, submitted to release escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryProof {
    pub proof_hash: String,
    #[serde(rename = "proofURI")]
    pub proof_uri: String,
    pub submitted_by: String,
}

impl DeliveryProof {
    /// Builds a proof for a finished session served from `base_uri`.
    pub fn for_session(session_id: &str, base_uri: &str, submitted_by: impl Into<String>) -> Self {
        Self {
            proof_hash: format!("0x{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            proof_uri: format!("{}/{}", base_uri.trim_end_matches('/'), session_id),
            submitted_by: submitted_by.into(),
        }
    }
}

/// Finalize `amount` against a previously granted lock.
#[derive(Debug, Clone, PartialEq)]
pub struct SettleRequest {
    pub lock_reference: String,
    pub amount: Decimal,
    pub reference: String,
    pub proof: DeliveryProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub settlement_id: Option<String>,
}

/// Return `amount` of a lock to the payer.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundRequest {
    pub lock_reference: String,
    pub amount: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub refund_id: Option<String>,
}

/// Wire body for creating a payment intent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentIntentBody<'a> {
    pub amount: String,
    pub currency: &'a str,
    #[serde(rename = "type")]
    pub intent_type: &'a str,
    pub settlement_method: &'a str,
    pub settlement_destination: &'a str,
    pub description: &'a str,
    pub metadata: BTreeMap<String, String>,
}

/// Wire body for delivery proof submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeliveryProofBody<'a> {
    #[serde(flatten)]
    pub proof: &'a DeliveryProof,
    pub amount: String,
    pub reference: &'a str,
}

/// Wire body for escrow refunds.
#[derive(Debug, Serialize)]
pub(crate) struct RefundBody<'a> {
    pub amount: String,
    pub reason: &'a str,
}

/// Finds the first string field among `keys`, looking inside a `data`
/// envelope first and then at the top level.
pub(crate) fn extract_field(body: &Value, keys: &[&str]) -> Option<String> {
    let scopes = [body.get("data"), Some(body)];
    for scope in scopes.into_iter().flatten() {
        for key in keys {
            match scope.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
    }
    None
}
