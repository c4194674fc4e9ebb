//! Store operations for the new_meters table.

use fieldsync_engine::{NewMeterDraft, NewMeterRecord, RecordId, RecordKind, UploadStatus};
use sqlx::{Row, SqlitePool};

use super::{records, Result};
use crate::clock;

/// A stored new-meter row from the database.
#[derive(Debug)]
pub struct StoredNewMeter {
    pub id: i64,
    pub account_id: String,
    pub serial_no_new: Option<String>,
    pub mfd_year_new: Option<String>,
    pub meter_make_new: Option<String>,
    pub initial_reading_kwh: Option<String>,
    pub initial_reading_kvah: Option<String>,
    pub image_1_new: Option<String>,
    pub image_2_new: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub is_uploaded: bool,
    pub upload_error: Option<String>,
    pub old_meter_id: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for StoredNewMeter {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(StoredNewMeter {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            serial_no_new: row.try_get("serial_no_new")?,
            mfd_year_new: row.try_get("mfd_year_new")?,
            meter_make_new: row.try_get("meter_make_new")?,
            initial_reading_kwh: row.try_get("initial_reading_kwh")?,
            initial_reading_kvah: row.try_get("initial_reading_kvah")?,
            image_1_new: row.try_get("image_1_new")?,
            image_2_new: row.try_get("image_2_new")?,
            lat: row.try_get("lat")?,
            lon: row.try_get("lon")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            is_uploaded: row.try_get("is_uploaded")?,
            upload_error: row.try_get("upload_error")?,
            old_meter_id: row.try_get("old_meter_id")?,
        })
    }
}

impl StoredNewMeter {
    /// Convert database row to an engine record.
    pub fn to_record(&self) -> NewMeterRecord {
        NewMeterRecord {
            id: self.id,
            draft: NewMeterDraft {
                account_id: self.account_id.clone(),
                serial_no_new: self.serial_no_new.clone(),
                mfd_year_new: self.mfd_year_new.clone(),
                meter_make_new: self.meter_make_new.clone(),
                initial_reading_kwh: self.initial_reading_kwh.clone(),
                initial_reading_kvah: self.initial_reading_kvah.clone(),
                image_1_new: self.image_1_new.clone(),
                image_2_new: self.image_2_new.clone(),
                lat: self.lat,
                lon: self.lon,
                created_by: self.created_by.clone(),
                created_at: self.created_at.clone(),
                old_meter_id: self.old_meter_id,
            },
            status: UploadStatus {
                is_uploaded: self.is_uploaded,
                upload_error: self.upload_error.clone(),
            },
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, account_id, serial_no_new, mfd_year_new, meter_make_new,
           initial_reading_kwh, initial_reading_kvah, image_1_new, image_2_new,
           lat, lon, created_by, created_at, is_uploaded, upload_error, old_meter_id
    FROM new_meters
"#;

/// Queue a new-meter record for upload.
pub async fn enqueue_new_meter(pool: &SqlitePool, draft: &NewMeterDraft) -> Result<RecordId> {
    draft.validate()?;

    let created_at = if draft.created_at.trim().is_empty() {
        clock::now_iso()
    } else {
        draft.created_at.clone()
    };

    let id = sqlx::query(
        r#"
        INSERT INTO new_meters (
            account_id, serial_no_new, mfd_year_new, meter_make_new,
            initial_reading_kwh, initial_reading_kvah, image_1_new, image_2_new,
            lat, lon, created_by, created_at, old_meter_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(draft.account_id.trim())
    .bind(&draft.serial_no_new)
    .bind(&draft.mfd_year_new)
    .bind(&draft.meter_make_new)
    .bind(&draft.initial_reading_kwh)
    .bind(&draft.initial_reading_kvah)
    .bind(&draft.image_1_new)
    .bind(&draft.image_2_new)
    .bind(draft.lat)
    .bind(draft.lon)
    .bind(&draft.created_by)
    .bind(created_at)
    .bind(draft.old_meter_id)
    .execute(pool)
    .await?
    .last_insert_rowid();

    tracing::debug!(record_id = id, account_id = %draft.account_id, "Queued new meter");
    Ok(id)
}

/// Get a new-meter record by id.
pub async fn get_new_meter(pool: &SqlitePool, id: RecordId) -> Result<Option<NewMeterRecord>> {
    let stored = sqlx::query_as::<_, StoredNewMeter>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(stored.map(|s| s.to_record()))
}

/// All new-meter records not yet confirmed, oldest first, errored included.
pub async fn list_pending_new_meters(pool: &SqlitePool) -> Result<Vec<NewMeterRecord>> {
    let stored = sqlx::query_as::<_, StoredNewMeter>(&format!(
        "{SELECT_COLUMNS} WHERE is_uploaded = 0 ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(stored.iter().map(StoredNewMeter::to_record).collect())
}

/// Drop a confirmed new-meter record. Deleting a missing id is a no-op.
pub async fn mark_new_meter_uploaded(pool: &SqlitePool, id: RecordId) -> Result<()> {
    records::delete_record(pool, RecordKind::New, id).await?;
    Ok(())
}
