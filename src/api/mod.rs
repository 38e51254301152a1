//! API module - HTTP handlers and routes

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::client::NanoClient;
use crate::config::Config;
use crate::trigger::AutoTrigger;

/// Shared state for all gateway handlers
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<NanoClient>,
    pub auto_trigger: Arc<AutoTrigger>,
    pub config: Arc<Config>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        // Service info
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::service_status))
        // Triggering
        .route("/trigger/both", post(handlers::trigger_both))
        .route("/trigger/:device", post(handlers::trigger_device))
        // Auto-trigger loop control
        .route("/auto-start", post(handlers::auto_start))
        .route("/auto-stop", post(handlers::auto_stop))
        // Upstream pass-throughs
        .route("/last/:device", get(handlers::last_response))
        .route("/logs", get(handlers::list_logs))
        .route("/logs/:filename", get(handlers::download_log))
}
