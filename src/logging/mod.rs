//! Logging subsystem.
//!
//! # Data Flow
//! ```text
//! tracing macros (all subsystems)
//!     → subscriber.rs (reloadable level filter + fmt layer)
//!     → LogWriter (one snapshot per event)
//!     → destination.rs (current file or stderr)
//!
//! Reopen triggers:
//!     SIGHUP (lifecycle::orchestrator) ──┐
//!     filesystem event (watcher.rs) ─────┴─→ LogDestination::reopen
//! ```
//!
//! # Design Decisions
//! - One destination per process, constructed explicitly and passed around
//! - Filename and handle are always published together
//! - External rotation is detected per file, never per directory tree

pub mod destination;
pub mod prepare;
pub mod subscriber;
pub mod watcher;

use std::io;
use std::path::PathBuf;

pub use destination::{LogDestination, LogWriter};
pub use prepare::prepare_file;
pub use subscriber::{init, parse_level, LevelHandle};
pub use watcher::{WatchBackend, WatchError, WatchSubscription};

/// Errors produced by the logging subsystem.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Pointing the destination at a new file failed.
    #[error("failed to open log {filename:?}: {source}")]
    Open { filename: String, source: io::Error },

    /// Re-acquiring the handle for the current file failed.
    #[error("failed to reopen log {filename:?}: {source}")]
    Reopen { filename: String, source: io::Error },

    /// Creating the log file or its directories failed.
    #[error("failed to prepare log {}: {source}", path.display())]
    Prepare { path: PathBuf, source: io::Error },

    /// Handing the log file to the run-as user failed.
    #[error("failed to change owner of {}: {source}", path.display())]
    Chown { path: PathBuf, source: nix::errno::Errno },

    /// The configured level is not a recognised level name.
    #[error("invalid log level {level:?}: {reason}")]
    Level { level: String, reason: String },

    /// The global subscriber could not be installed or updated.
    #[error("logging subscriber error: {0}")]
    Subscriber(String),
}
