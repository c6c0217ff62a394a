//! Gateway call failures.

use thiserror::Error;

/// Failure of a single gateway request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Request exceeded the configured timeout.
    #[error("gateway request timed out after {0}ms")]
    Timeout(u64),

    /// Endpoint is not offered by this gateway (e.g. optional delivery proof).
    #[error("gateway endpoint unavailable: {0}")]
    Unavailable(String),

    /// Gateway answered with a non-success status.
    #[error("gateway returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Connection-level failure.
    #[error("gateway transport error: {0}")]
    Transport(String),

    /// Response could not be understood.
    #[error("invalid gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Unavailable(_) | Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) => false,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_ms)
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<GatewayError> for billing_core::Error {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Timeout(_) => billing_core::Error::gateway_timeout(err.to_string()),
            other => billing_core::Error::gateway(other.to_string()),
        }
    }
}
