//! Host events: connectivity and app lifecycle.

use serde::{Deserialize, Serialize};

use crate::gateway::ConnectivityFlag;
use crate::scheduler::{AppLifecycle, Scheduler};

#[derive(Debug, Deserialize)]
pub struct ConnectivityEvent {
    pub connected: bool,
}

#[derive(Debug, Deserialize)]
pub struct AppStateEvent {
    pub state: AppLifecycle,
}

/// Whether the event started a sync.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub triggered: bool,
}

pub fn handle_connectivity(
    link: &ConnectivityFlag,
    scheduler: &Scheduler,
    event: ConnectivityEvent,
) -> EventResponse {
    link.set(event.connected);
    EventResponse {
        triggered: scheduler.on_connectivity_changed(event.connected).is_some(),
    }
}

pub async fn handle_app_state(scheduler: &Scheduler, event: AppStateEvent) -> EventResponse {
    EventResponse {
        triggered: scheduler.on_app_state_changed(event.state).await.is_some(),
    }
}
