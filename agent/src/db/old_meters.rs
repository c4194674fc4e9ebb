//! Store operations for the old_meters table.

use fieldsync_engine::{OldMeterDraft, OldMeterRecord, RecordId, RecordKind, UploadStatus};
use sqlx::{Row, SqlitePool};

use super::{records, Result};
use crate::clock;

/// A stored old-meter row from the database.
#[derive(Debug)]
pub struct StoredOldMeter {
    pub id: i64,
    pub account_id: String,
    pub serial_no_old: Option<String>,
    pub mfd_year_old: Option<String>,
    pub final_reading: Option<String>,
    pub meter_make_old: Option<String>,
    pub category: Option<String>,
    pub image_1_old: Option<String>,
    pub image_2_old: Option<String>,
    pub section_code: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub is_uploaded: bool,
    pub upload_error: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for StoredOldMeter {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(StoredOldMeter {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            serial_no_old: row.try_get("serial_no_old")?,
            mfd_year_old: row.try_get("mfd_year_old")?,
            final_reading: row.try_get("final_reading")?,
            meter_make_old: row.try_get("meter_make_old")?,
            category: row.try_get("category")?,
            image_1_old: row.try_get("image_1_old")?,
            image_2_old: row.try_get("image_2_old")?,
            section_code: row.try_get("section_code")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            is_uploaded: row.try_get("is_uploaded")?,
            upload_error: row.try_get("upload_error")?,
        })
    }
}

impl StoredOldMeter {
    /// Convert database row to an engine record.
    pub fn to_record(&self) -> OldMeterRecord {
        OldMeterRecord {
            id: self.id,
            draft: OldMeterDraft {
                account_id: self.account_id.clone(),
                serial_no_old: self.serial_no_old.clone(),
                mfd_year_old: self.mfd_year_old.clone(),
                final_reading: self.final_reading.clone(),
                meter_make_old: self.meter_make_old.clone(),
                category: records::parse_category(self.id, self.category.as_deref()),
                image_1_old: self.image_1_old.clone(),
                image_2_old: self.image_2_old.clone(),
                section_code: self.section_code.clone(),
                created_by: self.created_by.clone(),
                created_at: self.created_at.clone(),
            },
            status: UploadStatus {
                is_uploaded: self.is_uploaded,
                upload_error: self.upload_error.clone(),
            },
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, account_id, serial_no_old, mfd_year_old, final_reading,
           meter_make_old, category, image_1_old, image_2_old, section_code,
           created_by, created_at, is_uploaded, upload_error
    FROM old_meters
"#;

/// Queue an old-meter record for upload.
///
/// Rejects drafts without an account id. An empty `created_at` is filled
/// with the current time.
pub async fn enqueue_old_meter(pool: &SqlitePool, draft: &OldMeterDraft) -> Result<RecordId> {
    draft.validate()?;

    let created_at = if draft.created_at.trim().is_empty() {
        clock::now_iso()
    } else {
        draft.created_at.clone()
    };

    let id = sqlx::query(
        r#"
        INSERT INTO old_meters (
            account_id, serial_no_old, mfd_year_old, final_reading,
            meter_make_old, category, image_1_old, image_2_old,
            section_code, created_by, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(draft.account_id.trim())
    .bind(&draft.serial_no_old)
    .bind(&draft.mfd_year_old)
    .bind(&draft.final_reading)
    .bind(&draft.meter_make_old)
    .bind(draft.category.map(|c| c.as_str()))
    .bind(&draft.image_1_old)
    .bind(&draft.image_2_old)
    .bind(&draft.section_code)
    .bind(&draft.created_by)
    .bind(created_at)
    .execute(pool)
    .await?
    .last_insert_rowid();

    tracing::debug!(record_id = id, account_id = %draft.account_id, "Queued old meter");
    Ok(id)
}

/// Get an old-meter record by id.
pub async fn get_old_meter(pool: &SqlitePool, id: RecordId) -> Result<Option<OldMeterRecord>> {
    let stored = sqlx::query_as::<_, StoredOldMeter>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(stored.map(|s| s.to_record()))
}

/// All old-meter records not yet confirmed, oldest first.
///
/// Records carrying an `upload_error` are included; they are retried until
/// uploaded or explicitly deleted.
pub async fn list_pending_old_meters(pool: &SqlitePool) -> Result<Vec<OldMeterRecord>> {
    let stored = sqlx::query_as::<_, StoredOldMeter>(&format!(
        "{SELECT_COLUMNS} WHERE is_uploaded = 0 ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(stored.iter().map(StoredOldMeter::to_record).collect())
}

/// Drop a confirmed old-meter record. Deleting a missing id is a no-op.
pub async fn mark_old_meter_uploaded(pool: &SqlitePool, id: RecordId) -> Result<()> {
    records::delete_record(pool, RecordKind::Old, id).await?;
    Ok(())
}
