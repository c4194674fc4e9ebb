//! Per-stream run state with a cooldown window.
//!
//! Each sync stream (serial reconciliation, data upload) moves through
//! `Idle -> Running -> (Idle | Error)`. After a run completes, new triggers are
//! dropped until the cooldown elapses. Triggers are never queued. A run that
//! never reached the network ends without opening the cooldown.
//!
//! All times are milliseconds since epoch and are passed in by the caller, so
//! the tracker is deterministic.

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle phase of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamPhase {
    #[default]
    Idle,
    Running,
    /// Last run failed; behaves like idle for new triggers
    Error,
}

/// Why a trigger was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum TriggerRejected {
    #[error("already running")]
    AlreadyRunning,

    #[error("cooling down ({remaining_ms} ms left)")]
    #[serde(rename_all = "camelCase")]
    CoolingDown { remaining_ms: u64 },
}

/// Snapshot of a stream for status display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub phase: StreamPhase,
    pub is_running: bool,
    pub last_error: Option<String>,
    pub last_started_at: Option<Timestamp>,
    pub last_finished_at: Option<Timestamp>,
    pub last_success_at: Option<Timestamp>,
    pub cooldown_remaining_ms: u64,
}

/// Run state of one sync stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTracker {
    phase: StreamPhase,
    cooldown_ms: u64,
    last_error: Option<String>,
    last_started_at: Option<Timestamp>,
    last_finished_at: Option<Timestamp>,
    last_success_at: Option<Timestamp>,
    cooldown_from: Option<Timestamp>,
}

impl StreamTracker {
    /// Create an idle tracker with the given cooldown window.
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            phase: StreamPhase::Idle,
            cooldown_ms,
            last_error: None,
            last_started_at: None,
            last_finished_at: None,
            last_success_at: None,
            cooldown_from: None,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == StreamPhase::Running
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Milliseconds left in the cooldown window at `now`.
    pub fn cooldown_remaining(&self, now: Timestamp) -> u64 {
        match self.cooldown_from {
            Some(finished) => (finished + self.cooldown_ms).saturating_sub(now),
            None => 0,
        }
    }

    /// Try to start a run.
    ///
    /// `bypass_cooldown` is used by a forced sync; it never bypasses a run
    /// that is already in flight.
    pub fn try_begin(
        &mut self,
        now: Timestamp,
        bypass_cooldown: bool,
    ) -> Result<(), TriggerRejected> {
        if self.is_running() {
            return Err(TriggerRejected::AlreadyRunning);
        }

        let remaining_ms = self.cooldown_remaining(now);
        if !bypass_cooldown && remaining_ms > 0 {
            return Err(TriggerRejected::CoolingDown { remaining_ms });
        }

        self.phase = StreamPhase::Running;
        self.last_started_at = Some(now);
        Ok(())
    }

    /// Finish the current run and open the cooldown window.
    pub fn complete(&mut self, now: Timestamp, outcome: Result<(), String>) {
        self.last_finished_at = Some(now);
        self.cooldown_from = Some(now);
        match outcome {
            Ok(()) => {
                self.phase = StreamPhase::Idle;
                self.last_error = None;
                self.last_success_at = Some(now);
            }
            Err(message) => {
                self.phase = StreamPhase::Error;
                self.last_error = Some(message);
            }
        }
    }

    /// Finish the current run as failed and leave the stream open for the
    /// next trigger. Used when the run was abandoned before any remote call.
    pub fn abandon(&mut self, now: Timestamp, message: String) {
        self.last_finished_at = Some(now);
        self.cooldown_from = None;
        self.phase = StreamPhase::Error;
        self.last_error = Some(message);
    }

    pub fn status(&self, now: Timestamp) -> StreamStatus {
        StreamStatus {
            phase: self.phase,
            is_running: self.is_running(),
            last_error: self.last_error.clone(),
            last_started_at: self.last_started_at,
            last_finished_at: self.last_finished_at,
            last_success_at: self.last_success_at,
            cooldown_remaining_ms: if self.is_running() {
                0
            } else {
                self.cooldown_remaining(now)
            },
        }
    }
}
