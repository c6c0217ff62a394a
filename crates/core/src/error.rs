//! Unified error types for the billing engine.
//!
//! Error codes:
//! - SESSION_001-002: Session lifecycle errors
//! - PAY_001-003: Payment gateway errors
//! - STORE_001: Session store errors
//! - VALID_001: Validation errors

use thiserror::Error;

use crate::session::SessionStatus;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Session lifecycle error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorCode {
    /// SESSION_001: No record exists for the session id
    NotFound,
    /// SESSION_002: Session already completed or cancelled
    AlreadyTerminal,
}

impl SessionErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "SESSION_001",
            Self::AlreadyTerminal => "SESSION_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::AlreadyTerminal => 409,
        }
    }
}

/// Payment gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentErrorCode {
    /// PAY_001: Funds could not be locked
    LockFailed,
    /// PAY_002: Gateway call exceeded its timeout
    Timeout,
    /// PAY_003: Gateway rejected or failed a pass-through call
    Upstream,
}

impl PaymentErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockFailed => "PAY_001",
            Self::Timeout => "PAY_002",
            Self::Upstream => "PAY_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::LockFailed => 502,
            Self::Timeout => 504,
            Self::Upstream => 502,
        }
    }
}

/// Unified error type for the billing engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session {session_id} is already {status}")]
    SessionAlreadyTerminal {
        session_id: String,
        status: SessionStatus,
    },

    /// The gateway refused or could not process the lock. No session was created.
    #[error("failed to lock funds for session {session_id}: {reason}")]
    FundLockFailed { session_id: String, reason: String },

    #[error("payment gateway timed out: {0}")]
    GatewayTimeout(String),

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("session store error: {0}")]
    Store(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound(session_id.into())
    }

    pub fn already_terminal(session_id: impl Into<String>, status: SessionStatus) -> Self {
        Self::SessionAlreadyTerminal {
            session_id: session_id.into(),
            status,
        }
    }

    pub fn lock_failed(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FundLockFailed {
            session_id: session_id.into(),
            reason: reason.into(),
        }
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    pub fn gateway_timeout(msg: impl Into<String>) -> Self {
        Self::GatewayTimeout(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::SessionNotFound(_) => SessionErrorCode::NotFound.http_status(),
            Self::SessionAlreadyTerminal { .. } => SessionErrorCode::AlreadyTerminal.http_status(),
            Self::FundLockFailed { .. } => PaymentErrorCode::LockFailed.http_status(),
            Self::GatewayTimeout(_) => PaymentErrorCode::Timeout.http_status(),
            Self::Gateway(_) => PaymentErrorCode::Upstream.http_status(),
            Self::Store(_) => 500,
            Self::Validation(_) => 400,
            Self::Serialization(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => SessionErrorCode::NotFound.code(),
            Self::SessionAlreadyTerminal { .. } => SessionErrorCode::AlreadyTerminal.code(),
            Self::FundLockFailed { .. } => PaymentErrorCode::LockFailed.code(),
            Self::GatewayTimeout(_) => PaymentErrorCode::Timeout.code(),
            Self::Gateway(_) => PaymentErrorCode::Upstream.code(),
            Self::Store(_) => "STORE_001",
            Self::Validation(_) => "VALID_001",
            Self::Serialization(_) | Self::Internal(_) => "INTERNAL_001",
        }
    }
}
