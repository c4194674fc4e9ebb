//! Edge case tests for fieldsync-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use fieldsync_engine::{
    classify, compute_delta, group_by_account, FailureKind, NewMeterDraft, NewMeterRecord,
    OldMeterDraft, OldMeterRecord, RetryPolicy, SerialDirectoryResponse, StreamTracker,
    TriggerRejected, UploadStatus,
};
use std::collections::BTreeSet;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn old_record(id: i64, account: &str, created_at: &str) -> OldMeterRecord {
    OldMeterRecord {
        id,
        draft: OldMeterDraft {
            created_at: created_at.into(),
            ..OldMeterDraft::new(account)
        },
        status: UploadStatus::default(),
    }
}

fn new_record(id: i64, account: &str, created_at: &str) -> NewMeterRecord {
    NewMeterRecord {
        id,
        draft: NewMeterDraft {
            created_at: created_at.into(),
            ..NewMeterDraft::new(account)
        },
        status: UploadStatus::default(),
    }
}

// ============================================================================
// Serial Directory Edge Cases
// ============================================================================

#[test]
fn serials_with_only_separators() {
    let body = r#"{"status": true, "user_information": [
        {"id": 1, "box_id": null, "unused_meter_serial_no": ", , ,,"},
        {"id": 2, "box_id": null, "unused_meter_serial_no": ""}
    ]}"#;

    let response = SerialDirectoryResponse::parse(body).unwrap();
    assert!(response.flatten().is_empty());
}

#[test]
fn serials_spread_over_owners_are_merged() {
    let body = r#"{"status": "ok", "user_information": [
        {"id": 1, "box_id": "B1", "unused_meter_serial_no": "S1,S2"},
        {"id": 2, "box_id": "B2", "unused_meter_serial_no": "S2 ,S3"},
        {"id": 3, "box_id": "B3"}
    ]}"#;

    let response = SerialDirectoryResponse::parse(body).unwrap();
    assert_eq!(response.flatten(), set(&["S1", "S2", "S3"]));
}

#[test]
fn serial_comparison_is_case_sensitive() {
    let delta = compute_delta(&set(&["abc"]), &set(&["ABC"]));
    assert_eq!(delta.added, set(&["abc"]));
    assert_eq!(delta.removed, set(&["ABC"]));
}

#[test]
fn unicode_serials() {
    let body = r#"{"status": true, "user_information": [
        {"unused_meter_serial_no": "МТР-01, 電表-02"}
    ]}"#;

    let remote = SerialDirectoryResponse::parse(body).unwrap().flatten();
    assert!(remote.contains("МТР-01"));
    assert!(remote.contains("電表-02"));
}

#[test]
fn delta_against_empty_local() {
    let remote = set(&["S1", "S2"]);
    let delta = compute_delta(&remote, &BTreeSet::new());
    assert_eq!(delta.added, remote);
    assert!(delta.removed.is_empty());
}

#[test]
fn delta_against_empty_remote() {
    let local = set(&["S1", "S2"]);
    let delta = compute_delta(&BTreeSet::new(), &local);
    assert!(delta.added.is_empty());
    assert_eq!(delta.removed, local);
    assert!(delta.apply(&local).is_empty());
}

// ============================================================================
// Grouping Edge Cases
// ============================================================================

#[test]
fn many_accounts_sorted_oldest_first() {
    let old: Vec<_> = (0..50)
        .map(|i| {
            old_record(
                i,
                &format!("ACC-{:02}", 49 - i),
                &format!("2024-01-01T10:{:02}:00Z", 49 - i),
            )
        })
        .collect();

    let groups = group_by_account(old, vec![]);
    assert_eq!(groups.len(), 50);
    assert_eq!(groups[0].account_id, "ACC-00");
    assert_eq!(groups[49].account_id, "ACC-49");
}

#[test]
fn new_meter_only_account_still_grouped() {
    let groups = group_by_account(vec![], vec![new_record(1, "A1", "2024-01-01T00:00:00Z")]);

    assert_eq!(groups.len(), 1);
    assert!(groups[0].old_meters.is_empty());
    assert!(groups[0].has_valid_account());
}

#[test]
fn records_keep_input_order_within_group() {
    let groups = group_by_account(
        vec![
            old_record(5, "A1", "2024-01-01T00:00:00Z"),
            old_record(2, "A1", "2024-01-01T00:01:00Z"),
        ],
        vec![],
    );

    let ids: Vec<_> = groups[0].old_meters.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![5, 2]);
}

// ============================================================================
// Classification Edge Cases
// ============================================================================

#[test]
fn empty_message() {
    assert_eq!(classify(Some(418), "").kind, FailureKind::Other);
    assert_eq!(classify(None, "").kind, FailureKind::Network);
}

#[test]
fn duplicate_wins_over_server_status() {
    let c = classify(Some(500), "Duplicate entry: meter already exists");
    assert_eq!(c.kind, FailureKind::Duplicate);
    assert!(c.is_storage_error);
}

// ============================================================================
// Retry and Stream Edge Cases
// ============================================================================

#[test]
fn retry_caps_bound_attempts() {
    let policy = RetryPolicy::instance(0);
    let attempts = (1..=10).take_while(|a| policy.should_retry(*a, true)).count() + 1;
    assert_eq!(attempts as u32, RetryPolicy::INSTANCE_ATTEMPTS);
}

#[test]
fn zero_cooldown_never_drops() {
    let mut tracker = StreamTracker::new(0);
    for now in 0..5 {
        tracker.try_begin(now, false).unwrap();
        tracker.complete(now, Ok(()));
    }
}

#[test]
fn cooldown_boundary_is_exclusive() {
    let mut tracker = StreamTracker::new(100);
    tracker.try_begin(0, false).unwrap();
    tracker.complete(0, Ok(()));

    assert_eq!(
        tracker.try_begin(99, false),
        Err(TriggerRejected::CoolingDown { remaining_ms: 1 })
    );
    assert!(tracker.try_begin(100, false).is_ok());
}
