//! Scheduler triggers, cooldowns and status.

mod common;

use std::time::Duration;

use common::*;
use fieldsync_agent::db;
use fieldsync_agent::gateway::GatewayError;
use fieldsync_agent::scheduler::{AppLifecycle, SchedulerConfig, TriggerSource};
use fieldsync_engine::{StreamPhase, TriggerRejected, NO_CONNECTION};

#[tokio::test]
async fn triggers_during_cooldown_are_dropped() {
    let h = harness(scheduler_config()).await;
    add_old(&h.db, "A1", "2024-05-01T08:00:00Z").await;

    let first = h.scheduler.run_upload(TriggerSource::Timer).await.unwrap();
    assert_eq!(first.old_meter_uploaded, 1);

    add_old(&h.db, "A2", "2024-05-01T09:00:00Z").await;
    let second = h.scheduler.run_upload(TriggerSource::ConnectivityRestored).await;
    assert!(matches!(second, Err(TriggerRejected::CoolingDown { .. })));
    assert_eq!(h.gateway.count(&Call::Instance("A2".into())), 0);

    let status = h.scheduler.status().await;
    assert!(status.upload.cooldown_remaining_ms > 0);
    assert_eq!(status.upload.phase, StreamPhase::Idle);
}

#[tokio::test]
async fn force_sync_bypasses_cooldowns_and_runs_both() {
    let h = harness(scheduler_config()).await;
    h.scheduler.run_serial_sync(TriggerSource::Timer).await.unwrap();
    h.scheduler.run_upload(TriggerSource::Timer).await.unwrap();

    add_old(&h.db, "A1", "2024-05-01T08:00:00Z").await;
    add_new(&h.db, "A1", "2024-05-01T08:01:00Z").await;

    let result = h.scheduler.force_sync_now().await;

    assert!(result.success);
    assert!(result.serials.success);
    assert!(result.serials.is_full_sync);
    assert_eq!(result.upload.uploaded(), 2);
    assert_eq!(h.directory.calls(), 2);
    assert_eq!(
        db::list_available_serials(h.db.pool()).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn force_sync_reports_record_failures() {
    let h = harness(scheduler_config()).await;
    let old_id = add_old(&h.db, "A1", "2024-05-01T08:00:00Z").await;
    h.gateway.fail_old(old_id, usize::MAX, duplicate());

    let result = h.scheduler.force_sync_now().await;

    assert!(!result.success);
    assert!(result.serials.success);
    assert_eq!(result.upload.failed(), 1);

    let status = h.scheduler.status().await;
    assert_eq!(status.upload.phase, StreamPhase::Error);
    assert_eq!(status.upload.last_error.as_deref(), Some("1 record(s) failed"));
    assert_eq!(status.serial_sync.phase, StreamPhase::Idle);
}

#[tokio::test]
async fn failing_stream_does_not_affect_the_other() {
    let h = harness(scheduler_config()).await;
    h.directory.set_response(Err(GatewayError::Network("connection reset".into())));
    add_old(&h.db, "A1", "2024-05-01T08:00:00Z").await;

    let serials = h.scheduler.run_serial_sync(TriggerSource::Timer).await.unwrap();
    let upload = h.scheduler.run_upload(TriggerSource::Timer).await.unwrap();

    assert!(!serials.success);
    assert_eq!(upload.old_meter_uploaded, 1);

    let status = h.scheduler.status().await;
    assert_eq!(status.serial_sync.phase, StreamPhase::Error);
    assert_eq!(
        status.serial_sync.last_error.as_deref(),
        Some("network error: connection reset")
    );
    assert_eq!(status.upload.phase, StreamPhase::Idle);
    assert!(status.upload.last_success_at.is_some());
    assert!(status.last_upload_result.is_some());
}

#[tokio::test]
async fn offline_run_is_recorded_as_error() {
    let h = harness(scheduler_config()).await;
    h.link.set(false);

    let summary = h.scheduler.run_upload(TriggerSource::Timer).await.unwrap();
    assert_eq!(summary.reason.as_deref(), Some(NO_CONNECTION));

    let status = h.scheduler.status().await;
    assert_eq!(status.upload.last_error.as_deref(), Some(NO_CONNECTION));
    assert!(!status.upload.is_running);
}

#[tokio::test]
async fn offline_runs_leave_streams_open_for_connectivity_restore() {
    let h = harness(scheduler_config()).await;
    add_old(&h.db, "A1", "2024-05-01T08:00:00Z").await;
    h.link.set(false);
    assert!(h.scheduler.on_connectivity_changed(false).is_none());

    let serials = h.scheduler.run_serial_sync(TriggerSource::Timer).await.unwrap();
    let upload = h.scheduler.run_upload(TriggerSource::Timer).await.unwrap();
    assert_eq!(serials.error.as_deref(), Some(NO_CONNECTION));
    assert_eq!(upload.reason.as_deref(), Some(NO_CONNECTION));

    let status = h.scheduler.status().await;
    assert_eq!(status.upload.phase, StreamPhase::Error);
    assert_eq!(status.upload.cooldown_remaining_ms, 0);
    assert_eq!(status.serial_sync.cooldown_remaining_ms, 0);

    h.link.set(true);
    let handle = h.scheduler.on_connectivity_changed(true).unwrap();
    handle.await.unwrap();

    assert_eq!(h.directory.calls(), 1);
    assert_eq!(h.gateway.count(&Call::Instance("A1".into())), 1);

    let status = h.scheduler.status().await;
    assert_eq!(status.upload.phase, StreamPhase::Idle);
    assert!(status.upload.cooldown_remaining_ms > 0);
}

#[tokio::test]
async fn connectivity_restore_fires_both_streams() {
    let h = harness(scheduler_config()).await;
    add_old(&h.db, "A1", "2024-05-01T08:00:00Z").await;

    assert!(h.scheduler.on_connectivity_changed(false).is_none());
    assert!(!h.scheduler.status().await.is_online);

    let handle = h.scheduler.on_connectivity_changed(true).unwrap();
    handle.await.unwrap();

    assert_eq!(h.directory.calls(), 1);
    assert_eq!(h.gateway.count(&Call::Instance("A1".into())), 1);

    // already online: no new trigger
    assert!(h.scheduler.on_connectivity_changed(true).is_none());
}

#[tokio::test]
async fn foreground_transition_fires_both_streams() {
    let h = harness(scheduler_config()).await;

    assert!(h.scheduler.on_app_state_changed(AppLifecycle::Active).await.is_none());
    assert!(h
        .scheduler
        .on_app_state_changed(AppLifecycle::Background)
        .await
        .is_none());

    let handle = h
        .scheduler
        .on_app_state_changed(AppLifecycle::Active)
        .await
        .unwrap();
    handle.await.unwrap();
    assert_eq!(h.directory.calls(), 1);

    // a second foreground event lands inside both cooldowns
    h.scheduler
        .on_app_state_changed(AppLifecycle::Inactive)
        .await;
    let handle = h
        .scheduler
        .on_app_state_changed(AppLifecycle::Active)
        .await
        .unwrap();
    handle.await.unwrap();
    assert_eq!(h.directory.calls(), 1);
}

#[tokio::test]
async fn timers_run_until_shutdown() {
    let config = SchedulerConfig {
        serial_interval: Duration::from_millis(20),
        upload_interval: Duration::from_millis(20),
        serial_cooldown_ms: 0,
        upload_cooldown_ms: 0,
        event_stagger: Duration::from_millis(0),
    };
    let h = harness(config).await;

    let timers = h.scheduler.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.scheduler.shutdown();
    for timer in timers {
        timer.await.unwrap();
    }

    assert!(h.scheduler.is_shut_down());
    assert!(h.directory.calls() >= 1);
    let last_upload = db::get_last_sync_timestamp(h.db.pool(), db::SyncType::Upload)
        .await
        .unwrap();
    assert!(last_upload > 0);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        db::get_last_sync_timestamp(h.db.pool(), db::SyncType::Upload)
            .await
            .unwrap(),
        last_upload
    );
}
