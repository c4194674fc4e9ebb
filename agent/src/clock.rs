//! Wall-clock helpers. The engine never reads the clock; the agent passes
//! these values in.

use chrono::{SecondsFormat, Utc};
use fieldsync_engine::Timestamp;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> Timestamp {
    Utc::now().timestamp_millis().max(0) as Timestamp
}

/// Current time as an ISO-8601 string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
