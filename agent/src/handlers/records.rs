//! Record capture, lookup and removal.

use fieldsync_engine::{
    NewMeterDraft, NewMeterRecord, OldMeterDraft, OldMeterRecord, RecordId, RecordKind,
};
use serde::Serialize;

use crate::db::{self, Database};
use crate::error::{AppError, Result};

/// Response for an enqueued record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub id: RecordId,
    pub kind: RecordKind,
}

/// Whether a serial may be assigned to a new meter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialAvailability {
    pub serial_number: String,
    pub available: bool,
}

pub async fn handle_enqueue_old(db: &Database, draft: OldMeterDraft) -> Result<EnqueueResponse> {
    let id = db::enqueue_old_meter(db.pool(), &draft).await?;
    tracing::info!(record_id = id, account_id = %draft.account_id, "Old meter queued");
    Ok(EnqueueResponse {
        id,
        kind: RecordKind::Old,
    })
}

pub async fn handle_enqueue_new(db: &Database, draft: NewMeterDraft) -> Result<EnqueueResponse> {
    let id = db::enqueue_new_meter(db.pool(), &draft).await?;
    tracing::info!(record_id = id, account_id = %draft.account_id, "New meter queued");
    Ok(EnqueueResponse {
        id,
        kind: RecordKind::New,
    })
}

pub async fn handle_get_old(db: &Database, id: RecordId) -> Result<OldMeterRecord> {
    db::get_old_meter(db.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Old meter {}", id)))
}

pub async fn handle_get_new(db: &Database, id: RecordId) -> Result<NewMeterRecord> {
    db::get_new_meter(db.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("New meter {}", id)))
}

pub async fn handle_delete(db: &Database, kind: RecordKind, id: RecordId) -> Result<()> {
    db::delete_pending_record(db.pool(), kind, id).await?;
    Ok(())
}

pub async fn handle_serial_lookup(db: &Database, serial: &str) -> Result<SerialAvailability> {
    Ok(SerialAvailability {
        serial_number: serial.trim().to_string(),
        available: db::is_serial_available(db.pool(), serial).await?,
    })
}
