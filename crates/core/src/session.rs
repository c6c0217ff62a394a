//! Billing session records and their state machine.
//!
//! `active -> completed` via end, `active -> cancelled` via cancel. Nothing
//! leaves a terminal state. The end time lives inside the terminal variant,
//! so it exists exactly when the session is no longer active.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::{self, BillingTerms, Charge};
use crate::error::{Error, Result};
use crate::limits::MAX_QUIZ_SCORES;
use crate::side_data::{Feedback, QuizScore};

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh id (`sess_` followed by 32 hex chars).
    pub fn generate() -> Self {
        Self(format!("sess_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What is being consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Live tutoring session
    Teaching,
    /// Recorded video
    Video,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Teaching => "teaching",
            Self::Video => "video",
        }
    }
}

/// Reference to the resource a session bills for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceRef {
    pub fn teaching(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Teaching,
            id: id.into(),
        }
    }

    pub fn video(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Video,
            id: id.into(),
        }
    }
}

/// Lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frozen outcome of a terminated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closure {
    pub ended_at: DateTime<Utc>,
    pub amount_charged: Decimal,
    pub amount_refunded: Decimal,
    /// Cancellation reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Session state. Terminal variants carry the closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Completed(Closure),
    Cancelled(Closure),
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Active => SessionStatus::Active,
            Self::Completed(_) => SessionStatus::Completed,
            Self::Cancelled(_) => SessionStatus::Cancelled,
        }
    }

    pub fn closure(&self) -> Option<&Closure> {
        match self {
            Self::Active => None,
            Self::Completed(c) | Self::Cancelled(c) => Some(c),
        }
    }
}

/// Which gateway operation a receipt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptKind {
    Settlement,
    Refund,
}

/// Result of the settle or refund call made after a terminal transition.
///
/// An unconfirmed receipt is the degraded-success case: the session is
/// terminal, but the gateway did not confirm the money movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayReceipt {
    pub kind: ReceiptKind,
    pub confirmation_id: Option<String>,
    pub confirmed: bool,
    /// The failure is expected to clear on retry (e.g. optional proof endpoint missing)
    #[serde(default)]
    pub recoverable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl GatewayReceipt {
    pub fn confirmed(
        kind: ReceiptKind,
        confirmation_id: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            confirmation_id,
            confirmed: true,
            recoverable: false,
            error: None,
            recorded_at,
        }
    }

    pub fn degraded(
        kind: ReceiptKind,
        error: impl Into<String>,
        recoverable: bool,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            confirmation_id: None,
            confirmed: false,
            recoverable,
            error: Some(error.into()),
            recorded_at,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.confirmed
    }
}

/// Partial update applied to an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPatch {
    AppendQuizScore(QuizScore),
    SetFeedback(Feedback),
    SetReceipt(GatewayReceipt),
}

/// One billing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub resource: ResourceRef,
    pub payer: String,
    pub lock_reference: String,
    pub terms: BillingTerms,
    pub started_at: DateTime<Utc>,
    pub state: SessionState,
    #[serde(default)]
    pub receipt: Option<GatewayReceipt>,
    #[serde(default)]
    pub quiz_scores: Vec<QuizScore>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

impl SessionRecord {
    /// Creates an active record for a lock the gateway has already granted.
    pub fn open(
        session_id: SessionId,
        resource: ResourceRef,
        payer: impl Into<String>,
        lock_reference: impl Into<String>,
        terms: BillingTerms,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            resource,
            payer: payer.into(),
            lock_reference: lock_reference.into(),
            terms,
            started_at,
            state: SessionState::Active,
            receipt: None,
            quiz_scores: Vec::new(),
            feedback: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active)
    }

    pub fn locked_amount(&self) -> Decimal {
        self.terms.locked_amount
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.state.closure().map(|c| c.ended_at)
    }

    /// Live elapsed time while active, frozen at `ended_at - started_at` afterwards.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let until = self.ended_at().unwrap_or(now);
        (until - self.started_at).max(Duration::zero())
    }

    /// Terminal state for ending the session at `now`.
    pub fn completion(&self, now: DateTime<Utc>) -> SessionState {
        let elapsed = (now - self.started_at).max(Duration::zero());
        let charge = Charge::for_elapsed(self.terms.rate_per_minute, elapsed, self.locked_amount());

        SessionState::Completed(Closure {
            ended_at: now,
            amount_charged: charge.amount_charged,
            amount_refunded: charge.amount_refunded,
            reason: None,
        })
    }

    /// Terminal state for cancelling the session at `now`.
    pub fn cancellation(&self, now: DateTime<Utc>, reason: impl Into<String>) -> SessionState {
        let charge = Charge::full_refund(self.locked_amount());

        SessionState::Cancelled(Closure {
            ended_at: now,
            amount_charged: charge.amount_charged,
            amount_refunded: charge.amount_refunded,
            reason: Some(reason.into()),
        })
    }

    /// Moves an active record into `terminal`. Returns the current status if it is already terminal.
    pub fn close(&mut self, terminal: SessionState) -> std::result::Result<(), SessionStatus> {
        if !self.is_active() {
            return Err(self.status());
        }
        self.state = terminal;
        Ok(())
    }

    /// Applies a side-data or receipt patch. Never touches money or status.
    ///
    /// Rejects a quiz score once the session holds `MAX_QUIZ_SCORES`; the
    /// record is left unchanged.
    pub fn apply(&mut self, patch: SessionPatch) -> Result<()> {
        match patch {
            SessionPatch::AppendQuizScore(score) => {
                if self.quiz_scores.len() >= MAX_QUIZ_SCORES {
                    return Err(Error::validation(format!(
                        "session already has {} quiz scores",
                        MAX_QUIZ_SCORES
                    )));
                }
                self.quiz_scores.push(score);
            }
            SessionPatch::SetFeedback(feedback) => self.feedback = Some(feedback),
            SessionPatch::SetReceipt(receipt) => self.receipt = Some(receipt),
        }
        Ok(())
    }

    /// Point-in-time view for status polls.
    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let elapsed = self.elapsed(now);
        let amount_charged_estimate = match self.state.closure() {
            Some(closure) => closure.amount_charged,
            None => billing::live_estimate(self.terms.rate_per_minute, elapsed),
        };

        SessionSnapshot {
            session_id: self.session_id.clone(),
            status: self.status(),
            elapsed_seconds: billing::elapsed_seconds(elapsed),
            amount_charged_estimate,
            locked_amount: self.locked_amount(),
            rate_per_minute: self.terms.rate_per_minute,
            started_at: self.started_at,
            ended_at: self.ended_at(),
        }
    }

    /// Financial summary of a terminal session. `None` while active.
    pub fn summary(&self, receipt: GatewayReceipt) -> Option<SessionSummary> {
        let closure = self.state.closure()?;
        let elapsed = self.elapsed(closure.ended_at);

        Some(SessionSummary {
            session_id: self.session_id.clone(),
            status: self.status(),
            elapsed_seconds: billing::elapsed_seconds(elapsed),
            elapsed_minutes: billing::round_currency(billing::elapsed_minutes(elapsed)),
            locked_amount: self.locked_amount(),
            amount_charged: closure.amount_charged,
            amount_refunded: closure.amount_refunded,
            reason: closure.reason.clone(),
            receipt,
        })
    }
}

/// Status-poll view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub elapsed_seconds: u64,
    /// Live, uncapped estimate while active; the final charge once terminal
    pub amount_charged_estimate: Decimal,
    pub locked_amount: Decimal,
    pub rate_per_minute: Decimal,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Outcome of end or cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub elapsed_seconds: u64,
    pub elapsed_minutes: Decimal,
    pub locked_amount: Decimal,
    pub amount_charged: Decimal,
    pub amount_refunded: Decimal,
    pub reason: Option<String>,
    pub receipt: GatewayReceipt,
}

impl SessionSummary {
    /// Settlement or refund was not confirmed by the gateway.
    pub fn is_degraded(&self) -> bool {
        self.receipt.is_degraded()
    }
}
