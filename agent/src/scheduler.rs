//! Background scheduler for the two sync streams.
//!
//! Serial reconciliation and data upload run on independent timers and are
//! also fired by connectivity-restore and app-foreground events. Each stream
//! has its own [`StreamTracker`]: a trigger that arrives while the stream is
//! running or cooling down is dropped, never queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fieldsync_engine::{
    SerialSyncResult, StreamStatus, StreamTracker, TriggerRejected, UploadSummary,
    ALREADY_SYNCING, ALREADY_UPLOADING, NO_CONNECTION,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clock;
use crate::pipeline::UploadPipeline;
use crate::reconciler::SerialReconciler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamKind {
    SerialSync,
    Upload,
}

/// What fired a stream run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerSource {
    Timer,
    ConnectivityRestored,
    AppForeground,
    /// Explicit user action; bypasses cooldowns
    Manual,
}

/// Foreground state of the host app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppLifecycle {
    #[default]
    Active,
    Inactive,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub serial_interval: Duration,
    pub upload_interval: Duration,
    pub serial_cooldown_ms: u64,
    pub upload_cooldown_ms: u64,
    /// Delay between the two streams when an event fires both
    pub event_stagger: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            serial_interval: Duration::from_secs(30),
            upload_interval: Duration::from_secs(300),
            serial_cooldown_ms: 10_000,
            upload_cooldown_ms: 60_000,
            event_stagger: Duration::from_millis(1500),
        }
    }
}

/// Combined outcome of [`Scheduler::force_sync_now`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceSyncResult {
    pub success: bool,
    pub serials: SerialSyncResult,
    pub upload: UploadSummary,
}

/// Status snapshot for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub serial_sync: StreamStatus,
    pub upload: StreamStatus,
    pub is_online: bool,
    pub app_state: AppLifecycle,
    pub last_serial_result: Option<SerialSyncResult>,
    pub last_upload_result: Option<UploadSummary>,
}

struct Inner {
    reconciler: Arc<SerialReconciler>,
    pipeline: Arc<UploadPipeline>,
    config: SchedulerConfig,
    serial: Mutex<StreamTracker>,
    upload: Mutex<StreamTracker>,
    last_serial_result: Mutex<Option<SerialSyncResult>>,
    last_upload_result: Mutex<Option<UploadSummary>>,
    online: AtomicBool,
    app_state: Mutex<AppLifecycle>,
    shutdown: watch::Sender<bool>,
}

/// Drives the reconciler and the upload pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        reconciler: Arc<SerialReconciler>,
        pipeline: Arc<UploadPipeline>,
        config: SchedulerConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                reconciler,
                pipeline,
                serial: Mutex::new(StreamTracker::new(config.serial_cooldown_ms)),
                upload: Mutex::new(StreamTracker::new(config.upload_cooldown_ms)),
                config,
                last_serial_result: Mutex::new(None),
                last_upload_result: Mutex::new(None),
                online: AtomicBool::new(true),
                app_state: Mutex::new(AppLifecycle::Active),
                shutdown,
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Spawn both periodic timers. They stop after [`Scheduler::shutdown`];
    /// a run in progress is allowed to finish first.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!(
            serial_interval = ?self.inner.config.serial_interval,
            upload_interval = ?self.inner.config.upload_interval,
            "Scheduler started"
        );
        vec![
            self.spawn_timer(StreamKind::SerialSync, self.inner.config.serial_interval),
            self.spawn_timer(StreamKind::Upload, self.inner.config.upload_interval),
        ]
    }

    fn spawn_timer(&self, kind: StreamKind, period: Duration) -> JoinHandle<()> {
        let scheduler = self.clone();
        let mut shutdown = self.inner.shutdown.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => scheduler.trigger(kind, TriggerSource::Timer).await,
                    _ = shutdown.changed() => break,
                }
            }
            debug!(stream = ?kind, "Timer stopped");
        })
    }

    /// Stop the timers.
    pub fn shutdown(&self) {
        info!("Scheduler shutting down");
        self.inner.shutdown.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Run one stream and discard the result; rejections are logged only.
    pub async fn trigger(&self, kind: StreamKind, source: TriggerSource) {
        let rejected = match kind {
            StreamKind::SerialSync => self.run_serial_sync(source).await.err(),
            StreamKind::Upload => self.run_upload(source).await.err(),
        };
        if let Some(reason) = rejected {
            debug!(stream = ?kind, source = ?source, "Trigger dropped: {}", reason);
        }
    }

    /// Run the reconciler unless the stream is busy or cooling down.
    pub async fn run_serial_sync(
        &self,
        source: TriggerSource,
    ) -> Result<SerialSyncResult, TriggerRejected> {
        let manual = source == TriggerSource::Manual;
        self.inner.serial.lock().await.try_begin(clock::now_ms(), manual)?;

        let result = self
            .inner
            .reconciler
            .sync(manual, source != TriggerSource::Timer)
            .await;

        let outcome = if result.success {
            Ok(())
        } else {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "serial sync failed".to_string());
            warn!(source = ?source, "Serial sync stream failed: {}", message);
            Err(message)
        };
        Self::finish(&mut *self.inner.serial.lock().await, outcome);
        *self.inner.last_serial_result.lock().await = Some(result.clone());

        Ok(result)
    }

    /// A run stopped on a missing link opens no cooldown.
    fn finish(tracker: &mut StreamTracker, outcome: Result<(), String>) {
        match outcome {
            Err(message) if message == NO_CONNECTION => {
                tracker.abandon(clock::now_ms(), message)
            }
            outcome => tracker.complete(clock::now_ms(), outcome),
        }
    }

    /// Run the upload pipeline unless the stream is busy or cooling down.
    pub async fn run_upload(
        &self,
        source: TriggerSource,
    ) -> Result<UploadSummary, TriggerRejected> {
        let manual = source == TriggerSource::Manual;
        self.inner.upload.lock().await.try_begin(clock::now_ms(), manual)?;

        let summary = self.inner.pipeline.upload_pending().await;

        let outcome = if !summary.success {
            Err(summary
                .reason
                .clone()
                .unwrap_or_else(|| "upload failed".to_string()))
        } else if summary.failed() > 0 {
            Err(format!("{} record(s) failed", summary.failed()))
        } else {
            Ok(())
        };
        if let Err(message) = &outcome {
            warn!(source = ?source, "Upload stream failed: {}", message);
        }
        Self::finish(&mut *self.inner.upload.lock().await, outcome);
        *self.inner.last_upload_result.lock().await = Some(summary.clone());

        Ok(summary)
    }

    /// Reconcile, then upload, both bypassing cooldowns.
    ///
    /// A stream that is already running is reported as failed rather than
    /// waited for.
    pub async fn force_sync_now(&self) -> ForceSyncResult {
        info!("Forced sync requested");

        let serials = match self.run_serial_sync(TriggerSource::Manual).await {
            Ok(result) => result,
            Err(_) => SerialSyncResult::failed(ALREADY_SYNCING),
        };
        let upload = match self.run_upload(TriggerSource::Manual).await {
            Ok(summary) => summary,
            Err(_) => UploadSummary::aborted(ALREADY_UPLOADING),
        };

        ForceSyncResult {
            success: serials.success && upload.success && upload.failed() == 0,
            serials,
            upload,
        }
    }

    /// Record a link state change. Fires both streams when the link comes
    /// back; returns the handle of that run.
    pub fn on_connectivity_changed(&self, connected: bool) -> Option<JoinHandle<()>> {
        let was_connected = self.inner.online.swap(connected, Ordering::SeqCst);
        if connected && !was_connected {
            info!("Connectivity restored");
            return Some(self.spawn_event_sync(TriggerSource::ConnectivityRestored));
        }
        if !connected && was_connected {
            info!("Connectivity lost");
        }
        None
    }

    /// Record an app state change. Fires both streams when the app returns
    /// to the foreground.
    pub async fn on_app_state_changed(&self, state: AppLifecycle) -> Option<JoinHandle<()>> {
        let previous = std::mem::replace(&mut *self.inner.app_state.lock().await, state);
        if state == AppLifecycle::Active && previous != AppLifecycle::Active {
            debug!(previous = ?previous, "App returned to foreground");
            return Some(self.spawn_event_sync(TriggerSource::AppForeground));
        }
        None
    }

    /// Serial sync now, upload after the stagger delay. The two runs do not
    /// wait on each other.
    fn spawn_event_sync(&self, source: TriggerSource) -> JoinHandle<()> {
        let scheduler = self.clone();
        let stagger = self.inner.config.event_stagger;

        tokio::spawn(async move {
            let serial = {
                let scheduler = scheduler.clone();
                tokio::spawn(async move {
                    scheduler.trigger(StreamKind::SerialSync, source).await;
                })
            };

            tokio::time::sleep(stagger).await;
            scheduler.trigger(StreamKind::Upload, source).await;

            if let Err(e) = serial.await {
                warn!("Serial sync task ended abnormally: {}", e);
            }
        })
    }

    pub async fn status(&self) -> SyncStatus {
        let now = clock::now_ms();
        SyncStatus {
            serial_sync: self.inner.serial.lock().await.status(now),
            upload: self.inner.upload.lock().await.status(now),
            is_online: self.inner.online.load(Ordering::SeqCst),
            app_state: *self.inner.app_state.lock().await,
            last_serial_result: self.inner.last_serial_result.lock().await.clone(),
            last_upload_result: self.inner.last_upload_result.lock().await.clone(),
        }
    }
}
