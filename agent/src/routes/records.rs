//! Record routes used by the capture layer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fieldsync_engine::{
    NewMeterDraft, NewMeterRecord, OldMeterDraft, OldMeterRecord, RecordId, RecordKind,
};

use crate::auth::ControlAuth;
use crate::error::Result;
use crate::handlers::{
    handle_delete, handle_enqueue_new, handle_enqueue_old, handle_get_new, handle_get_old,
    handle_serial_lookup, EnqueueResponse, SerialAvailability,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/old-meters", post(enqueue_old))
        .route("/old-meters/{id}", get(get_old).delete(delete_old))
        .route("/new-meters", post(enqueue_new))
        .route("/new-meters/{id}", get(get_new).delete(delete_new))
        .route("/serials/{serial}", get(serial_lookup))
}

/// POST /old-meters - Queue an old-meter record.
async fn enqueue_old(
    State(state): State<AppState>,
    _auth: ControlAuth,
    Json(draft): Json<OldMeterDraft>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    let response = handle_enqueue_old(&state.db, draft).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /new-meters - Queue a new-meter record.
async fn enqueue_new(
    State(state): State<AppState>,
    _auth: ControlAuth,
    Json(draft): Json<NewMeterDraft>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    let response = handle_enqueue_new(&state.db, draft).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_old(
    State(state): State<AppState>,
    _auth: ControlAuth,
    Path(id): Path<RecordId>,
) -> Result<Json<OldMeterRecord>> {
    Ok(Json(handle_get_old(&state.db, id).await?))
}

async fn get_new(
    State(state): State<AppState>,
    _auth: ControlAuth,
    Path(id): Path<RecordId>,
) -> Result<Json<NewMeterRecord>> {
    Ok(Json(handle_get_new(&state.db, id).await?))
}

/// DELETE /old-meters/{id} - Discard a pending record.
async fn delete_old(
    State(state): State<AppState>,
    _auth: ControlAuth,
    Path(id): Path<RecordId>,
) -> Result<StatusCode> {
    handle_delete(&state.db, RecordKind::Old, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_new(
    State(state): State<AppState>,
    _auth: ControlAuth,
    Path(id): Path<RecordId>,
) -> Result<StatusCode> {
    handle_delete(&state.db, RecordKind::New, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /serials/{serial} - Check a serial against the available list.
async fn serial_lookup(
    State(state): State<AppState>,
    _auth: ControlAuth,
    Path(serial): Path<String>,
) -> Result<Json<SerialAvailability>> {
    Ok(Json(handle_serial_lookup(&state.db, &serial).await?))
}
