//! Record types for locally captured meter data.
//!
//! Records are created by the capture layer as drafts, persisted by the local
//! store with an assigned id, and destroyed once the backend confirms them.

use crate::{error::Result, AccountId, Error, ImageRef, RecordId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reason recorded on a new-meter record whose account had no successful
/// old-meter upload in the same pass.
pub const SKIPPED_DEPENDENCY_MESSAGE: &str = "skipped: old meter upload failed for this account";

/// Reason recorded on every record of a group with an empty account id.
pub const INVALID_ACCOUNT_MESSAGE: &str = "invalid account id";

/// Category of the meter being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeterCategory {
    Em,
    Mnr,
    Dc,
    Rnv,
}

impl MeterCategory {
    /// Category code as sent to the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeterCategory::Em => "EM",
            MeterCategory::Mnr => "MNR",
            MeterCategory::Dc => "DC",
            MeterCategory::Rnv => "RNV",
        }
    }
}

impl fmt::Display for MeterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeterCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EM" => Ok(MeterCategory::Em),
            "MNR" => Ok(MeterCategory::Mnr),
            "DC" => Ok(MeterCategory::Dc),
            "RNV" => Ok(MeterCategory::Rnv),
            _ => Err(Error::UnknownCategory(s.to_string())),
        }
    }
}

/// Which of the two record tables a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// The meter being removed
    Old,
    /// The meter being installed
    New,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Old => "old",
            RecordKind::New => "new",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a pending record has failed before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PendingState {
    /// Never attempted, or last attempt left no error
    Clean,
    /// Last attempt recorded an error; still retried
    Errored,
}

/// Check that an account id is usable as a grouping key.
pub fn validate_account_id(account_id: &str) -> Result<()> {
    if account_id.trim().is_empty() {
        return Err(Error::InvalidRecord("account_id is required".into()));
    }
    Ok(())
}

/// Old-meter form data as captured in the field, before it has a local id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OldMeterDraft {
    pub account_id: AccountId,
    #[serde(default)]
    pub serial_no_old: Option<String>,
    #[serde(default)]
    pub mfd_year_old: Option<String>,
    #[serde(default)]
    pub final_reading: Option<String>,
    #[serde(default)]
    pub meter_make_old: Option<String>,
    #[serde(default)]
    pub category: Option<MeterCategory>,
    #[serde(default)]
    pub image_1_old: Option<ImageRef>,
    #[serde(default)]
    pub image_2_old: Option<ImageRef>,
    #[serde(default)]
    pub section_code: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    /// ISO-8601; filled in by the store when left empty
    #[serde(default)]
    pub created_at: String,
}

impl OldMeterDraft {
    /// Create a draft for an account with every optional field empty.
    pub fn new(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_account_id(&self.account_id)
    }
}

/// New-meter form data as captured in the field, before it has a local id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeterDraft {
    pub account_id: AccountId,
    #[serde(default)]
    pub serial_no_new: Option<String>,
    #[serde(default)]
    pub mfd_year_new: Option<String>,
    #[serde(default)]
    pub meter_make_new: Option<String>,
    #[serde(default)]
    pub initial_reading_kwh: Option<String>,
    #[serde(default)]
    pub initial_reading_kvah: Option<String>,
    #[serde(default)]
    pub image_1_new: Option<ImageRef>,
    #[serde(default)]
    pub image_2_new: Option<ImageRef>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: String,
    /// Audit link to the old-meter record captured in the same visit.
    /// Never consulted for upload ordering.
    #[serde(default)]
    pub old_meter_id: Option<RecordId>,
}

impl NewMeterDraft {
    pub fn new(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_account_id(&self.account_id)
    }
}

/// Status columns shared by both record kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatus {
    pub is_uploaded: bool,
    pub upload_error: Option<String>,
}

impl UploadStatus {
    pub fn pending_state(&self) -> PendingState {
        match self.upload_error {
            Some(_) => PendingState::Errored,
            None => PendingState::Clean,
        }
    }
}

/// A persisted old-meter record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OldMeterRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub draft: OldMeterDraft,
    #[serde(flatten)]
    pub status: UploadStatus,
}

/// A persisted new-meter record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeterRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub draft: NewMeterDraft,
    #[serde(flatten)]
    pub status: UploadStatus,
}

/// Common view over both record kinds, used by grouping and reporting.
pub trait PendingRecord {
    const KIND: RecordKind;

    fn id(&self) -> RecordId;
    fn account_id(&self) -> &str;
    fn created_at(&self) -> &str;
    fn status(&self) -> &UploadStatus;
}

impl PendingRecord for OldMeterRecord {
    const KIND: RecordKind = RecordKind::Old;

    fn id(&self) -> RecordId {
        self.id
    }

    fn account_id(&self) -> &str {
        &self.draft.account_id
    }

    fn created_at(&self) -> &str {
        &self.draft.created_at
    }

    fn status(&self) -> &UploadStatus {
        &self.status
    }
}

impl PendingRecord for NewMeterRecord {
    const KIND: RecordKind = RecordKind::New;

    fn id(&self) -> RecordId {
        self.id
    }

    fn account_id(&self) -> &str {
        &self.draft.account_id
    }

    fn created_at(&self) -> &str {
        &self.draft.created_at
    }

    fn status(&self) -> &UploadStatus {
        &self.status
    }
}
