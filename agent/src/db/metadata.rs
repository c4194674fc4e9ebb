//! Sync metadata: last completed sync per sync type.

use std::fmt;

use fieldsync_engine::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::Result;

/// Kinds of sync whose completion time is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncType {
    SerialNumbers,
    Upload,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::SerialNumbers => "serial_numbers",
            SyncType::Upload => "upload",
        }
    }

    /// Metadata key, `last_<type>_sync`.
    pub fn key(&self) -> String {
        format!("last_{}_sync", self.as_str())
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Epoch milliseconds of the last completed sync, 0 if never.
pub async fn get_last_sync_timestamp(pool: &SqlitePool, sync_type: SyncType) -> Result<Timestamp> {
    let value = sqlx::query_scalar::<_, i64>("SELECT value FROM sync_metadata WHERE key = ?")
        .bind(sync_type.key())
        .fetch_optional(pool)
        .await?;

    Ok(value.unwrap_or(0).max(0) as u64)
}

/// Record a completed sync.
pub async fn set_last_sync_timestamp(
    pool: &SqlitePool,
    sync_type: SyncType,
    now: Timestamp,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sync_metadata (key, value)
        VALUES (?, ?)
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
        "#,
    )
    .bind(sync_type.key())
    .bind(now as i64)
    .execute(pool)
    .await?;

    Ok(())
}
