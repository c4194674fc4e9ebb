//! Best-effort classification of upload failures.
//!
//! The backend has no typed error contract, so failures are classified from
//! the HTTP status and the text of the response. This is a heuristic: if the
//! backend changes its wording, classification degrades to
//! [`FailureKind::Other`] without affecting control flow.

use serde::{Deserialize, Serialize};

const DUPLICATE_MARKERS: &[&str] = &["already exists", "already been taken"];
const STORAGE_MARKERS: &[&str] = &["disk", "upload", "driver"];

/// Failure taxonomy surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Local data is unusable (e.g. missing account id)
    Validation,
    /// No connectivity, timeout, connection reset
    Network,
    /// 401 or missing credentials
    Auth,
    /// 5xx from the backend
    Server,
    /// Business-rule conflict such as a serial already installed
    Duplicate,
    /// New meter held back because no old meter of the account uploaded
    SkippedDependency,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Whether the same request may succeed if simply retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::Network | FailureKind::Server)
    }

    /// Whether a person has to edit or resubmit the record before it can go
    /// through.
    pub fn needs_attention(&self) -> bool {
        matches!(self, FailureKind::Validation | FailureKind::Duplicate)
    }
}

/// Outcome of classifying one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub kind: FailureKind,
    pub is_duplicate_serial: bool,
    pub is_storage_error: bool,
    pub is_auth_error: bool,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Classify a failed response by status and message text.
///
/// `status` is `None` when no HTTP response was received.
pub fn classify(status: Option<u16>, message: &str) -> Classification {
    let text = message.to_ascii_lowercase();

    let is_auth_error = status == Some(401);
    let is_duplicate_serial = contains_any(&text, DUPLICATE_MARKERS);
    let is_storage_error = status == Some(500) || contains_any(&text, STORAGE_MARKERS);

    let kind = match status {
        Some(401) => FailureKind::Auth,
        _ if is_duplicate_serial => FailureKind::Duplicate,
        Some(code) if (500..600).contains(&code) => FailureKind::Server,
        None => FailureKind::Network,
        Some(_) => FailureKind::Other,
    };

    Classification {
        kind,
        is_duplicate_serial,
        is_storage_error,
        is_auth_error,
    }
}

impl Classification {
    /// Classification for a failure that never reached the backend.
    pub fn local(kind: FailureKind) -> Self {
        Self {
            kind,
            is_duplicate_serial: false,
            is_storage_error: false,
            is_auth_error: kind == FailureKind::Auth,
        }
    }
}
