//! Available serial numbers: remote directory payload, flattening and deltas.
//!
//! The remote directory groups unused serial numbers by owner (contractor or
//! box) as comma-separated strings. The local table only cares about the flat
//! set, so ownership is dropped during flattening.
//!
//! # Algorithm
//!
//! 1. Split each owner's string on commas, trim, drop empties
//! 2. Union all owners into one set (string equality after trimming)
//! 3. `added = remote - local`, `removed = local - remote`
//!
//! Applying the delta to the local set yields exactly the remote set.

use crate::{error::Result, Error, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A serial number a field agent may assign to a new meter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSerial {
    pub serial_number: String,
    pub is_valid: bool,
    pub is_used: bool,
    /// Milliseconds since epoch
    pub last_updated: Timestamp,
}

impl AvailableSerial {
    /// A freshly synced serial: valid and unused.
    pub fn fresh(serial_number: impl Into<String>, now: Timestamp) -> Self {
        Self {
            serial_number: serial_number.into(),
            is_valid: true,
            is_used: false,
            last_updated: now,
        }
    }

    /// Whether an agent may pick this serial.
    pub fn is_assignable(&self) -> bool {
        self.is_valid && !self.is_used
    }
}

/// One owner entry of the serial directory response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSerials {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub box_id: Option<serde_json::Value>,
    #[serde(default)]
    pub unused_meter_serial_no: Option<String>,
}

/// Body returned by the remote serial directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialDirectoryResponse {
    #[serde(default)]
    pub status: serde_json::Value,
    #[serde(default)]
    pub user_information: Option<Vec<OwnerSerials>>,
}

impl SerialDirectoryResponse {
    /// Parse and sanity-check a directory body.
    ///
    /// A body without `user_information`, or with an explicit failure status,
    /// is a format error rather than an empty directory.
    pub fn parse(body: &str) -> Result<Self> {
        let response: SerialDirectoryResponse = serde_json::from_str(body)
            .map_err(|e| Error::InvalidDirectoryPayload(e.to_string()))?;

        if matches!(response.status, serde_json::Value::Bool(false)) {
            return Err(Error::InvalidDirectoryPayload(
                "directory reported status=false".into(),
            ));
        }

        if response.user_information.is_none() {
            return Err(Error::InvalidDirectoryPayload(
                "missing user_information".into(),
            ));
        }

        Ok(response)
    }

    /// All serials in the response as one flat set.
    pub fn flatten(&self) -> BTreeSet<String> {
        flatten_serials(self.user_information.as_deref().unwrap_or_default())
    }
}

/// Split a comma-separated serial list into trimmed, non-empty entries.
pub fn split_serials(csv: &str) -> impl Iterator<Item = &str> {
    csv.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Flatten owner groups into a single set of serial numbers.
pub fn flatten_serials(owners: &[OwnerSerials]) -> BTreeSet<String> {
    owners
        .iter()
        .filter_map(|owner| owner.unused_meter_serial_no.as_deref())
        .flat_map(split_serials)
        .map(str::to_string)
        .collect()
}

/// Difference between the remote and local serial sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialDelta {
    /// In remote, missing locally
    pub added: BTreeSet<String>,
    /// Present locally, gone from remote
    pub removed: BTreeSet<String>,
}

impl SerialDelta {
    /// Whether the local set already matches the remote set.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Apply this delta to a local set.
    pub fn apply(&self, local: &BTreeSet<String>) -> BTreeSet<String> {
        local
            .difference(&self.removed)
            .cloned()
            .chain(self.added.iter().cloned())
            .collect()
    }
}

/// Compute the minimal delta that turns `local` into `remote`.
pub fn compute_delta(remote: &BTreeSet<String>, local: &BTreeSet<String>) -> SerialDelta {
    SerialDelta {
        added: remote.difference(local).cloned().collect(),
        removed: local.difference(remote).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn owner(csv: &str) -> OwnerSerials {
        OwnerSerials {
            id: None,
            box_id: None,
            unused_meter_serial_no: Some(csv.to_string()),
        }
    }

    #[test]
    fn flatten_trims_and_dedups() {
        let owners = vec![owner("S1, S2,S1"), owner(" ,S4 ,, "), OwnerSerials {
            id: None,
            box_id: None,
            unused_meter_serial_no: None,
        }];

        assert_eq!(flatten_serials(&owners), set(&["S1", "S2", "S4"]));
    }

    #[test]
    fn delta_matches_set_difference() {
        let remote = set(&["S1", "S2"]);
        let local = set(&["S2", "S3"]);

        let delta = compute_delta(&remote, &local);
        assert_eq!(delta.added, set(&["S1"]));
        assert_eq!(delta.removed, set(&["S3"]));
        assert_eq!(delta.apply(&local), remote);
    }

    #[test]
    fn delta_empty_when_equal() {
        let both = set(&["A", "B"]);
        let delta = compute_delta(&both, &both);
        assert!(delta.is_empty());
        assert_eq!(delta.apply(&both), both);
    }

    #[test]
    fn parse_directory_body() {
        let body = r#"{
            "status": true,
            "user_information": [
                {"id": 4, "box_id": "B-12", "unused_meter_serial_no": "S1, S2,S1"}
            ]
        }"#;

        let response = SerialDirectoryResponse::parse(body).unwrap();
        assert_eq!(response.flatten(), set(&["S1", "S2"]));
    }

    #[test]
    fn parse_rejects_missing_information() {
        let err = SerialDirectoryResponse::parse(r#"{"status": true}"#).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidDirectoryPayload("missing user_information".into())
        );

        assert!(SerialDirectoryResponse::parse("not json").is_err());
        assert!(
            SerialDirectoryResponse::parse(r#"{"status": false, "user_information": []}"#)
                .is_err()
        );
    }

    #[test]
    fn parse_accepts_empty_directory() {
        let response =
            SerialDirectoryResponse::parse(r#"{"status": "success", "user_information": []}"#)
                .unwrap();
        assert!(response.flatten().is_empty());
    }

    #[test]
    fn assignable_requires_valid_and_unused() {
        let mut serial = AvailableSerial::fresh("S1", 1000);
        assert!(serial.is_assignable());

        serial.is_used = true;
        assert!(!serial.is_assignable());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_set() -> impl Strategy<Value = BTreeSet<String>> {
            proptest::collection::btree_set("[A-D][0-9]", 0..12)
        }

        proptest! {
            #[test]
            fn prop_apply_delta_yields_remote(remote in arb_set(), local in arb_set()) {
                let delta = compute_delta(&remote, &local);
                prop_assert_eq!(delta.apply(&local), remote);
            }

            #[test]
            fn prop_added_and_removed_disjoint(remote in arb_set(), local in arb_set()) {
                let delta = compute_delta(&remote, &local);
                prop_assert!(delta.added.is_disjoint(&delta.removed));
                prop_assert!(delta.added.is_disjoint(&local));
                prop_assert!(delta.removed.is_subset(&local));
            }

            #[test]
            fn prop_second_delta_is_empty(remote in arb_set(), local in arb_set()) {
                let synced = compute_delta(&remote, &local).apply(&local);
                prop_assert!(compute_delta(&remote, &synced).is_empty());
            }
        }
    }
}
