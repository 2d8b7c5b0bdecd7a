//! Process identity and background execution.
//!
//! # Responsibilities
//! - Resolve the configured run-as user (run_as.rs)
//! - Re-execute in the background with a session of its own (daemon.rs)
//! - Record the daemon pid (pidfile.rs)
//! - Drop root privileges in the foreground (privileges.rs)
//!
//! # Design Decisions
//! - Daemonizing re-executes the binary instead of forking, so no thread
//!   (logger watcher, runtime workers) is ever lost in a child
//! - The child is recognised by a marker environment variable

pub mod daemon;
pub mod pidfile;
pub mod privileges;
pub mod run_as;

use std::io;
use std::path::PathBuf;

pub use daemon::{reborn, Rebirth};
pub use pidfile::PidFile;
pub use privileges::drop_privileges;
pub use run_as::{resolve_user, RunAs};

/// Errors from process identity and daemon control.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("unknown user {0:?}")]
    UnknownUser(String),

    #[error("failed to look up user {name:?}: {source}")]
    Lookup { name: String, source: nix::errno::Errno },

    #[error("failed to switch to user {name:?}: {source}")]
    Privileges { name: String, source: nix::errno::Errno },

    #[error("failed to start background process: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to start new session: {0}")]
    Session(#[source] nix::errno::Errno),

    #[error("failed to write pidfile {}: {source}", path.display())]
    PidFile { path: PathBuf, source: io::Error },
}
