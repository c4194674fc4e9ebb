//! Status, statistics and failure listing.

use serde::Serialize;

use crate::db::{self, Database, DatabaseStats, FailedRecord};
use crate::error::Result;
use crate::scheduler::{Scheduler, SyncStatus};

/// Response for GET /status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub sync: SyncStatus,
    pub stats: DatabaseStats,
}

pub async fn handle_status(db: &Database, scheduler: &Scheduler) -> Result<StatusResponse> {
    Ok(StatusResponse {
        sync: scheduler.status().await,
        stats: db::get_database_stats(db.pool()).await?,
    })
}

pub async fn handle_stats(db: &Database) -> Result<DatabaseStats> {
    Ok(db::get_database_stats(db.pool()).await?)
}

pub async fn handle_failures(db: &Database) -> Result<Vec<FailedRecord>> {
    Ok(db::list_failed_records(db.pool()).await?)
}

/// Wipe local data, e.g. on sign-out.
pub async fn handle_clear(db: &Database) -> Result<()> {
    db::clear_all(db.pool()).await?;
    Ok(())
}
