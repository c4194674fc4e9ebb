//! Serial number reconciliation.
//!
//! Keeps the local `available_serials` table in line with the remote serial
//! directory, either by full replace or by applying the minimal delta.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fieldsync_engine::{
    compute_delta, flatten_serials, OwnerSerials, SerialSyncResult, ALREADY_SYNCING, NO_CONNECTION,
};
use tracing::{debug, error, info, warn};

use crate::clock;
use crate::db::{self, Database, DatabaseError, SyncType};
use crate::gateway::{Connectivity, GatewayError, SerialDirectory};

/// Minimum spacing between two unforced reconciliations.
pub const SERIAL_SYNC_COOLDOWN_MS: u64 = 30_000;

/// Clears an in-flight flag when dropped.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    /// Set the flag, or return `None` if it was already set.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SerialReconciler {
    db: Database,
    directory: Arc<dyn SerialDirectory>,
    connectivity: Arc<dyn Connectivity>,
    cooldown_ms: u64,
    in_flight: AtomicBool,
}

impl SerialReconciler {
    pub fn new(
        db: Database,
        directory: Arc<dyn SerialDirectory>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            db,
            directory,
            connectivity,
            cooldown_ms: SERIAL_SYNC_COOLDOWN_MS,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_cooldown(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch the owner-grouped serial lists from the directory.
    pub async fn fetch_remote_serials(&self) -> Result<Vec<OwnerSerials>, GatewayError> {
        self.directory.fetch_serials().await
    }

    /// Run one reconciliation.
    ///
    /// `force` skips the cooldown and replaces the whole table; otherwise only
    /// the delta is applied. `notify` marks a run the user is waiting on and
    /// is logged at info level instead of debug. A call made while another
    /// is in flight returns [`ALREADY_SYNCING`] immediately.
    pub async fn sync(&self, force: bool, notify: bool) -> SerialSyncResult {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Serial sync already in flight");
            return SerialSyncResult::failed(ALREADY_SYNCING);
        };

        match self.run(force, notify).await {
            Ok(result) => result,
            Err(e) => {
                error!("Serial sync failed on local store: {}", e);
                SerialSyncResult::failed(e.to_string())
            }
        }
    }

    async fn run(&self, force: bool, notify: bool) -> Result<SerialSyncResult, DatabaseError> {
        let pool = self.db.pool();

        let now = clock::now_ms();
        let last = db::get_last_sync_timestamp(pool, SyncType::SerialNumbers).await?;
        if !force && last > 0 && now.saturating_sub(last) < self.cooldown_ms {
            debug!(last_sync = last, "Serial sync skipped, synced recently");
            return Ok(SerialSyncResult::skipped());
        }

        if !self.connectivity.is_online().await {
            debug!("Serial sync skipped, no connection");
            return Ok(SerialSyncResult::failed(NO_CONNECTION));
        }

        let owners = match self.fetch_remote_serials().await {
            Ok(owners) => owners,
            Err(e) => {
                warn!("Serial directory fetch failed: {}", e);
                return Ok(SerialSyncResult::failed(e.to_string()));
            }
        };
        let remote = flatten_serials(&owners);
        let now = clock::now_ms();

        let (saved, removed) = if remote.is_empty() {
            (0, 0)
        } else if force {
            let local = db::list_available_serials(pool).await?;
            let removed = local.difference(&remote).count();
            let saved = db::replace_available_serials(pool, &remote, true, now).await?;
            (saved, removed)
        } else {
            let local = db::list_available_serials(pool).await?;
            let delta = compute_delta(&remote, &local);
            if delta.is_empty() {
                (0, 0)
            } else {
                db::apply_serial_delta(pool, &delta, now).await?
            }
        };

        db::set_last_sync_timestamp(pool, SyncType::SerialNumbers, now).await?;
        let total_available = db::count_available_serials(pool).await?;

        if notify {
            info!(saved, removed, total_available, full = force, "Serial sync complete");
        } else {
            debug!(saved, removed, total_available, full = force, "Serial sync complete");
        }

        Ok(SerialSyncResult {
            success: true,
            saved,
            removed,
            is_full_sync: force,
            total_available,
            skipped: false,
            error: None,
        })
    }
}
