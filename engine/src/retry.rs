//! Fixed-delay retry policy.
//!
//! The policy only decides; the caller owns the clock and the sleeping. Delays
//! are constant, never exponential, and attempt caps are small so one pipeline
//! pass has a bounded worst case.

use serde::{Deserialize, Serialize};

/// How many times to try an operation and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Fixed delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Account-instance creation: up to 3 attempts.
    pub const INSTANCE_ATTEMPTS: u32 = 3;
    /// Record upload: first try plus 2 retries on 5xx.
    pub const UPLOAD_ATTEMPTS: u32 = 3;

    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay_ms,
        }
    }

    /// Policy for the account-instance step.
    pub fn instance(delay_ms: u64) -> Self {
        Self::new(Self::INSTANCE_ATTEMPTS, delay_ms)
    }

    /// Policy for a single record upload.
    pub fn upload(delay_ms: u64) -> Self {
        Self::new(Self::UPLOAD_ATTEMPTS, delay_ms)
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::new(1, 0)
    }

    /// Decide whether to try again after `attempt` (1-based) failed.
    pub fn should_retry(&self, attempt: u32, transient: bool) -> bool {
        transient && attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::upload(2000)
    }
}
