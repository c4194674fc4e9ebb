//! Errors from the remote gateway and serial directory.

use fieldsync_engine::{classify, Classification, FailureKind};
use thiserror::Error;

/// A failed call to the backend.
///
/// Cloneable so one instance-creation failure can be recorded on every
/// record of an account group.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The credential provider has no token; no request was sent.
    #[error("not authenticated: missing auth token")]
    MissingToken,

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// The body could not be understood.
    #[error("invalid response: {0}")]
    Format(String),

    /// A captured image referenced by the record could not be read.
    #[error("image unavailable: {0}")]
    Image(String),
}

impl GatewayError {
    /// HTTP status of the response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn classification(&self) -> Classification {
        match self {
            GatewayError::MissingToken => Classification::local(FailureKind::Auth),
            GatewayError::Status { status, message } => classify(Some(*status), message),
            GatewayError::Network(message) => classify(None, message),
            GatewayError::Timeout => Classification::local(FailureKind::Network),
            GatewayError::Format(_) => Classification::local(FailureKind::Other),
            GatewayError::Image(_) => Classification::local(FailureKind::Validation),
        }
    }

    /// 5xx, timeouts and connection failures.
    ///
    /// Decided from the transport alone; the body text never changes it.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Status { status, .. } => (500..600).contains(status),
            GatewayError::Timeout | GatewayError::Network(_) => true,
            GatewayError::MissingToken | GatewayError::Format(_) | GatewayError::Image(_) => false,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.classification().kind == FailureKind::Auth
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_decode() {
            GatewayError::Format(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}
