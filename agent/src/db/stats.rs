//! Summary counts for status display.

use fieldsync_engine::Timestamp;
use serde::Serialize;
use sqlx::SqlitePool;

use super::{count_available_serials, get_last_sync_timestamp, Result, SyncType};

/// Pending counts and sync times polled by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub pending_old_meters: usize,
    pub pending_new_meters: usize,
    /// Pending old meters whose last attempt failed
    pub errored_old_meters: usize,
    pub errored_new_meters: usize,
    pub available_serials: usize,
    pub last_serial_sync: Timestamp,
    pub last_upload_sync: Timestamp,
}

impl DatabaseStats {
    pub fn total_pending(&self) -> usize {
        self.pending_old_meters + self.pending_new_meters
    }
}

async fn pending_counts(pool: &SqlitePool, table: &str) -> Result<(usize, usize)> {
    let (pending, errored): (i64, i64) = sqlx::query_as(&format!(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(CASE WHEN upload_error IS NOT NULL THEN 1 ELSE 0 END), 0)
        FROM {table}
        WHERE is_uploaded = 0
        "#
    ))
    .fetch_one(pool)
    .await?;

    Ok((pending.max(0) as usize, errored.max(0) as usize))
}

/// Gather the current store summary.
pub async fn get_database_stats(pool: &SqlitePool) -> Result<DatabaseStats> {
    let (pending_old_meters, errored_old_meters) = pending_counts(pool, "old_meters").await?;
    let (pending_new_meters, errored_new_meters) = pending_counts(pool, "new_meters").await?;

    Ok(DatabaseStats {
        pending_old_meters,
        pending_new_meters,
        errored_old_meters,
        errored_new_meters,
        available_serials: count_available_serials(pool).await?,
        last_serial_sync: get_last_sync_timestamp(pool, SyncType::SerialNumbers).await?,
        last_upload_sync: get_last_sync_timestamp(pool, SyncType::Upload).await?,
    })
}
