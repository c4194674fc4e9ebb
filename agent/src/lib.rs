//! # Fieldsync Agent
//!
//! On-device sync service for field meter-replacement records.
//!
//! Records captured offline are queued in a local SQLite store and pushed to
//! the backend when the network allows; the list of assignable meter serials
//! is kept in step with the backend's serial directory. The UI shell talks to
//! the agent over a loopback HTTP API.
//!
//! - [`db`]: local record store
//! - [`reconciler`]: serial number reconciliation
//! - [`pipeline`]: per-account upload of pending records
//! - [`scheduler`]: timers, event triggers and cooldowns for both streams
//! - [`gateway`]: backend clients, connectivity and credentials

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod pipeline;
pub mod reconciler;
pub mod retry;
pub mod routes;
pub mod scheduler;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::gateway::ConnectivityFlag;
use crate::scheduler::Scheduler;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub scheduler: Scheduler,
    /// Link state pushed in by the host
    pub link: ConnectivityFlag,
    pub config: Arc<Config>,
}

/// Build the control API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
