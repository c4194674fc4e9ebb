//! # Fieldsync Engine
//!
//! Deterministic rules for syncing field meter-replacement records.
//!
//! This crate holds the logic of the offline-first sync subsystem without any
//! I/O: what a valid record is, how pending records are grouped, how the
//! available-serial table is reconciled, how failures are classified, when to
//! retry, and when a sync stream may start.
//!
//! ## Design Principles
//!
//! - **No IO**: no files, network, database or wall clock
//! - **Deterministic**: time is passed in as epoch milliseconds
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! Field agents capture an [`OldMeterDraft`] (meter being removed) and a
//! [`NewMeterDraft`] (meter being installed). Once persisted they become
//! [`OldMeterRecord`] / [`NewMeterRecord`] with a local id and an
//! [`UploadStatus`]. A record is deleted locally once the backend confirms it.
//!
//! ### Account groups
//!
//! [`group_by_account`] builds one [`AccountGroup`] per account id. Within a
//! group, new meters may only be uploaded after at least one old meter of the
//! same account was accepted.
//!
//! ### Serial reconciliation
//!
//! [`SerialDirectoryResponse`] is flattened into a set and compared with the
//! local set via [`compute_delta`]:
//!
//! ```rust
//! use fieldsync_engine::{compute_delta, SerialDirectoryResponse};
//! use std::collections::BTreeSet;
//!
//! let body = r#"{"status": true, "user_information": [
//!     {"id": 1, "box_id": "B1", "unused_meter_serial_no": "S1, S2,S1"}
//! ]}"#;
//! let remote = SerialDirectoryResponse::parse(body).unwrap().flatten();
//! let local: BTreeSet<String> = ["S2", "S3"].iter().map(|s| s.to_string()).collect();
//!
//! let delta = compute_delta(&remote, &local);
//! assert!(delta.added.contains("S1"));
//! assert!(delta.removed.contains("S3"));
//! assert_eq!(delta.apply(&local), remote);
//! ```
//!
//! ### Failures and retries
//!
//! [`classify`] maps an HTTP status and message to a [`Classification`];
//! [`RetryPolicy`] decides whether a failed attempt is tried again.
//!
//! ### Streams
//!
//! [`StreamTracker`] is the `idle -> running -> (idle | error)` state of one
//! sync stream with its cooldown window.

pub mod classify;
pub mod error;
pub mod group;
pub mod record;
pub mod report;
pub mod retry;
pub mod serial;
pub mod stream;

// Re-export main types at crate root
pub use classify::{classify, Classification, FailureKind};
pub use error::Error;
pub use group::{group_by_account, AccountGroup};
pub use record::{
    validate_account_id, MeterCategory, NewMeterDraft, NewMeterRecord, OldMeterDraft,
    OldMeterRecord, PendingRecord, PendingState, RecordKind, UploadStatus,
    INVALID_ACCOUNT_MESSAGE, SKIPPED_DEPENDENCY_MESSAGE,
};
pub use report::{
    RecordFailure, SerialSyncResult, UploadSummary, ALREADY_SYNCING, ALREADY_UPLOADING,
    NO_CONNECTION,
};
pub use retry::RetryPolicy;
pub use serial::{
    compute_delta, flatten_serials, split_serials, AvailableSerial, OwnerSerials, SerialDelta,
    SerialDirectoryResponse,
};
pub use stream::{StreamPhase, StreamStatus, StreamTracker, TriggerRejected};

/// Type aliases for clarity
pub type RecordId = i64;
pub type AccountId = String;
pub type ImageRef = String;
pub type Timestamp = u64;
