//! Sync control and status routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};

use crate::auth::ControlAuth;
use crate::db::{DatabaseStats, FailedRecord};
use crate::error::{AppError, Result};
use crate::handlers::{handle_clear, handle_failures, handle_stats, handle_status, StatusResponse};
use crate::scheduler::ForceSyncResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(force_sync))
        .route("/status", get(status))
        .route("/stats", get(stats))
        .route("/failures", get(failures))
        .route("/local-data", delete(clear_local_data))
}

/// POST /sync - Reconcile serials and upload now, bypassing cooldowns.
///
/// The run is spawned so a client hanging up does not cancel it halfway.
async fn force_sync(
    State(state): State<AppState>,
    _auth: ControlAuth,
) -> Result<Json<ForceSyncResult>> {
    let scheduler = state.scheduler.clone();
    let result = tokio::spawn(async move { scheduler.force_sync_now().await })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(result))
}

async fn status(State(state): State<AppState>, _auth: ControlAuth) -> Result<Json<StatusResponse>> {
    Ok(Json(handle_status(&state.db, &state.scheduler).await?))
}

async fn stats(State(state): State<AppState>, _auth: ControlAuth) -> Result<Json<DatabaseStats>> {
    Ok(Json(handle_stats(&state.db).await?))
}

/// GET /failures - Pending records whose last attempt failed.
async fn failures(
    State(state): State<AppState>,
    _auth: ControlAuth,
) -> Result<Json<Vec<FailedRecord>>> {
    Ok(Json(handle_failures(&state.db).await?))
}

/// DELETE /local-data - Wipe every local table.
async fn clear_local_data(State(state): State<AppState>, _auth: ControlAuth) -> Result<StatusCode> {
    handle_clear(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}
