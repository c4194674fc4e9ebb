//! HTTP route definitions.

mod events;
mod health;
mod records;
mod sync;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(records::routes())
        .merge(sync::routes())
        .merge(events::routes())
}
