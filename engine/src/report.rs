//! Result types returned by the reconciler, the pipeline and forced syncs.

use crate::{AccountId, Classification, FailureKind, RecordId, RecordKind};
use serde::{Deserialize, Serialize};

/// Reason reported when no network is reachable.
pub const NO_CONNECTION: &str = "no connection";
/// Reason reported when the reconciler is already in flight.
pub const ALREADY_SYNCING: &str = "already syncing";
/// Reason reported when the pipeline is already in flight.
pub const ALREADY_UPLOADING: &str = "already uploading";

/// Outcome of one serial reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialSyncResult {
    pub success: bool,
    /// Serials inserted or refreshed
    pub saved: usize,
    /// Serials deleted because the remote no longer lists them
    pub removed: usize,
    pub is_full_sync: bool,
    /// Rows in the local table after the run
    pub total_available: usize,
    /// Cooldown hit; nothing was fetched
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SerialSyncResult {
    pub fn skipped() -> Self {
        Self {
            success: true,
            skipped: true,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// One record that did not make it to the backend in this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    pub record_id: RecordId,
    pub kind: RecordKind,
    pub account_id: AccountId,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub failure_kind: FailureKind,
    pub is_duplicate_serial: bool,
    pub is_storage_error: bool,
    pub is_auth_error: bool,
    /// A person must edit or resubmit; retrying alone will not help
    pub needs_attention: bool,
}

impl RecordFailure {
    pub fn new(
        record_id: RecordId,
        kind: RecordKind,
        account_id: impl Into<AccountId>,
        message: impl Into<String>,
        status: Option<u16>,
        classification: Classification,
    ) -> Self {
        Self {
            record_id,
            kind,
            account_id: account_id.into(),
            message: message.into(),
            status,
            failure_kind: classification.kind,
            is_duplicate_serial: classification.is_duplicate_serial,
            is_storage_error: classification.is_storage_error,
            is_auth_error: classification.is_auth_error,
            needs_attention: classification.kind.needs_attention(),
        }
    }
}

/// Outcome of one upload pipeline pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub old_meter_uploaded: usize,
    pub old_meter_total: usize,
    pub new_meter_uploaded: usize,
    pub new_meter_total: usize,
    /// New meters held back by the ordering rule
    pub skipped: usize,
    /// Accounts left for a later pass by the per-pass bound
    pub deferred_accounts: usize,
    pub failures: Vec<RecordFailure>,
}

impl UploadSummary {
    /// A pass that did nothing at all.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn uploaded(&self) -> usize {
        self.old_meter_uploaded + self.new_meter_uploaded
    }

    pub fn failed(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.failure_kind != FailureKind::SkippedDependency)
            .count()
    }

    pub fn auth_failures(&self) -> usize {
        self.failures.iter().filter(|f| f.is_auth_error).count()
    }

    /// Fold another partial summary (one account group) into this one.
    pub fn merge(&mut self, other: UploadSummary) {
        self.old_meter_uploaded += other.old_meter_uploaded;
        self.old_meter_total += other.old_meter_total;
        self.new_meter_uploaded += other.new_meter_uploaded;
        self.new_meter_total += other.new_meter_total;
        self.skipped += other.skipped;
        self.deferred_accounts += other.deferred_accounts;
        self.failures.extend(other.failures);
    }
}
