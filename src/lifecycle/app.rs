//! Contract for the application whose lifecycle the daemon drives.

use std::future::Future;

use crate::config::ConfigError;
use crate::logging::LogError;

/// Errors reported by a managed application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to apply log level: {0}")]
    Level(#[from] LogError),

    #[error("application already started")]
    AlreadyStarted,

    #[error("no async runtime available: {0}")]
    Runtime(String),
}

/// The long-running service behind the daemon.
///
/// Implementations provide their own synchronisation: the orchestrator may
/// call `reload_configuration` and `graceful_stop` from concurrent tasks.
pub trait ManagedApplication: Send + Sync + 'static {
    /// Load the initial configuration.
    fn parse_configuration(&self) -> Result<(), AppError>;

    /// Start background work. Requires a Tokio runtime.
    fn start(&self) -> Result<(), AppError>;

    /// Re-read configuration; on failure the previous one stays active.
    fn reload_configuration(&self) -> Result<(), AppError>;

    /// Ask the application to finish in-flight work and stop.
    fn graceful_stop(&self);

    /// Resolve once the application has fully stopped.
    fn run_until_stopped(&self) -> impl Future<Output = ()> + Send;
}
