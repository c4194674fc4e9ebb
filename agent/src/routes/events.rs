//! Host event routes.

use axum::{extract::State, routing::post, Json, Router};

use crate::auth::ControlAuth;
use crate::handlers::{
    handle_app_state, handle_connectivity, AppStateEvent, ConnectivityEvent, EventResponse,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/connectivity", post(connectivity))
        .route("/events/app-state", post(app_state))
}

/// POST /events/connectivity - Link state changed.
async fn connectivity(
    State(state): State<AppState>,
    _auth: ControlAuth,
    Json(event): Json<ConnectivityEvent>,
) -> Json<EventResponse> {
    Json(handle_connectivity(&state.link, &state.scheduler, event))
}

/// POST /events/app-state - App moved between foreground and background.
async fn app_state(
    State(state): State<AppState>,
    _auth: ControlAuth,
    Json(event): Json<AppStateEvent>,
) -> Json<EventResponse> {
    Json(handle_app_state(&state.scheduler, event).await)
}
