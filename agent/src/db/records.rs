//! Operations shared by both record tables.

use fieldsync_engine::{MeterCategory, RecordId, RecordKind};
use serde::Serialize;
use sqlx::SqlitePool;

use super::{DatabaseError, Result};

pub(crate) fn table_name(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Old => "old_meters",
        RecordKind::New => "new_meters",
    }
}

/// Parse a stored category code, dropping unknown codes.
pub(crate) fn parse_category(id: RecordId, code: Option<&str>) -> Option<MeterCategory> {
    let code = code?;
    match code.parse() {
        Ok(category) => Some(category),
        Err(e) => {
            tracing::warn!(record_id = id, "Ignoring stored category: {}", e);
            None
        }
    }
}

/// Delete a record row. Returns whether a row was removed.
pub async fn delete_record(pool: &SqlitePool, kind: RecordKind, id: RecordId) -> Result<bool> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table_name(kind)))
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Record why the last upload attempt of a record failed.
///
/// The record stays pending (`is_uploaded = 0`) and is retried on the next
/// pass.
pub async fn mark_with_error(
    pool: &SqlitePool,
    kind: RecordKind,
    id: RecordId,
    message: &str,
) -> Result<()> {
    sqlx::query(&format!(
        "UPDATE {} SET upload_error = ?, is_uploaded = 0 WHERE id = ?",
        table_name(kind)
    ))
    .bind(message)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Explicitly discard a pending record, e.g. one that needs re-capture.
///
/// Unlike the upload path this reports a missing id.
pub async fn delete_pending_record(
    pool: &SqlitePool,
    kind: RecordKind,
    id: RecordId,
) -> Result<()> {
    if !delete_record(pool, kind, id).await? {
        return Err(DatabaseError::NotFound {
            entity: match kind {
                RecordKind::Old => "Old meter",
                RecordKind::New => "New meter",
            },
            id: id.to_string(),
        });
    }

    tracing::info!(record_id = id, kind = %kind, "Pending record discarded");
    Ok(())
}

/// A pending record whose last upload attempt failed.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecord {
    pub kind: String,
    pub id: i64,
    pub account_id: String,
    pub upload_error: String,
    pub created_at: String,
}

/// All pending records carrying an error, oldest first.
pub async fn list_failed_records(pool: &SqlitePool) -> Result<Vec<FailedRecord>> {
    let failed = sqlx::query_as::<_, FailedRecord>(
        r#"
        SELECT 'old' AS kind, id, account_id, upload_error, created_at
        FROM old_meters
        WHERE is_uploaded = 0 AND upload_error IS NOT NULL
        UNION ALL
        SELECT 'new' AS kind, id, account_id, upload_error, created_at
        FROM new_meters
        WHERE is_uploaded = 0 AND upload_error IS NOT NULL
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(failed)
}

/// Wipe every local table, e.g. on sign-out.
pub async fn clear_all(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for table in ["old_meters", "new_meters", "available_serials", "sync_metadata"] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!("Cleared all local data");
    Ok(())
}
