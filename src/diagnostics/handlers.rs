use axum::{extract::State, Json};
use serde::Serialize;

use crate::diagnostics::DiagnosticsState;
use crate::lifecycle::LifecycleState;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub pid: u32,
    pub uptime_secs: u64,
    pub state: LifecycleState,
}

#[derive(Debug, Serialize)]
pub struct LogStatus {
    pub filename: String,
    pub generation: u64,
    pub stderr: bool,
    pub watching: bool,
}

pub async fn get_status(State(state): State<DiagnosticsState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        pid: std::process::id(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        state: *state.lifecycle.borrow(),
    })
}

pub async fn get_log(State(state): State<DiagnosticsState>) -> Json<LogStatus> {
    let destination = &state.destination;
    Json(LogStatus {
        filename: destination.filename(),
        generation: destination.generation(),
        stderr: destination.writes_to_stderr(),
        watching: destination.is_watching(),
    })
}
