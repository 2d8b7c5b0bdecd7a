//! Diagnostics HTTP endpoint.
//!
//! # Responsibilities
//! - Expose runtime status and log destination state as JSON
//! - Start on a configured address; stop idempotently on the terminal signal
//!
//! # Design Decisions
//! - Optional: disabled by default
//! - Read-only; nothing here mutates daemon state

pub mod handlers;
pub mod server;

use std::sync::Arc;
use std::time::Instant;

use axum::{routing::get, Router};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::lifecycle::LifecycleState;
use crate::logging::LogDestination;

pub use server::{DiagnosticsError, DiagnosticsServer};

/// State shared with the diagnostics handlers.
#[derive(Debug, Clone)]
pub struct DiagnosticsState {
    pub destination: Arc<LogDestination>,
    pub lifecycle: watch::Receiver<LifecycleState>,
    pub started_at: Instant,
}

impl DiagnosticsState {
    pub fn new(
        destination: Arc<LogDestination>,
        lifecycle: watch::Receiver<LifecycleState>,
    ) -> Self {
        Self {
            destination,
            lifecycle,
            started_at: Instant::now(),
        }
    }
}

pub fn setup_router(state: DiagnosticsState) -> Router {
    Router::new()
        .route("/debug/status", get(handlers::get_status))
        .route("/debug/log", get(handlers::get_log))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
