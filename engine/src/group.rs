//! Grouping of pending records by account.
//!
//! An [`AccountGroup`] is computed fresh on every pipeline pass and is never
//! persisted. Groups are independent of each other; within a group the
//! old-meter records must be uploaded before any new-meter record.

use crate::{AccountId, NewMeterRecord, OldMeterRecord, PendingRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All pending records sharing one account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountGroup {
    pub account_id: AccountId,
    pub old_meters: Vec<OldMeterRecord>,
    pub new_meters: Vec<NewMeterRecord>,
}

impl AccountGroup {
    fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            old_meters: Vec::new(),
            new_meters: Vec::new(),
        }
    }

    /// Whether the account id can be sent to the backend.
    pub fn has_valid_account(&self) -> bool {
        !self.account_id.trim().is_empty()
    }

    /// Total number of records in the group.
    pub fn len(&self) -> usize {
        self.old_meters.len() + self.new_meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Earliest `created_at` across both kinds, used to process the oldest
    /// accounts first.
    pub fn oldest_created_at(&self) -> Option<&str> {
        let old = self.old_meters.iter().map(|r| r.created_at());
        let new = self.new_meters.iter().map(|r| r.created_at());
        old.chain(new).min()
    }
}

/// Group pending records by account id.
///
/// Account ids are compared after trimming, so `"A1"` and `" A1 "` land in the
/// same group. Records keep their input order within each kind. Groups are
/// returned oldest first (by earliest `created_at`), ties broken by account id.
pub fn group_by_account(
    old_meters: Vec<OldMeterRecord>,
    new_meters: Vec<NewMeterRecord>,
) -> Vec<AccountGroup> {
    let mut groups: BTreeMap<AccountId, AccountGroup> = BTreeMap::new();

    for record in old_meters {
        let key = record.account_id().trim().to_string();
        groups
            .entry(key.clone())
            .or_insert_with(|| AccountGroup::new(key))
            .old_meters
            .push(record);
    }

    for record in new_meters {
        let key = record.account_id().trim().to_string();
        groups
            .entry(key.clone())
            .or_insert_with(|| AccountGroup::new(key))
            .new_meters
            .push(record);
    }

    let mut groups: Vec<AccountGroup> = groups.into_values().collect();
    groups.sort_by(|a, b| {
        a.oldest_created_at()
            .cmp(&b.oldest_created_at())
            .then_with(|| a.account_id.cmp(&b.account_id))
    });
    groups
}
