//! Background execution by re-executing the current binary.

use std::env;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use crate::process::{ProcessError, RunAs};

/// Environment variable marking the background child.
pub const CHILD_MARKER: &str = "CARBON_AGENT_DAEMON_CHILD";

/// Which side of the re-execution this process is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebirth {
    /// The foreground process; it should exit after spawning the child.
    Parent { pid: u32 },
    /// The background child; it should continue starting up.
    Child,
}

/// Whether this process is the background child.
pub fn is_child() -> bool {
    env::var_os(CHILD_MARKER).is_some()
}

/// Move the daemon into the background.
///
/// In the foreground process this spawns the same binary with the same
/// arguments, detached stdio and the run-as credentials, and returns
/// [`Rebirth::Parent`]. In the child it starts a new session and returns
/// [`Rebirth::Child`].
pub fn reborn(run_as: Option<&RunAs>) -> Result<Rebirth, ProcessError> {
    if is_child() {
        nix::unistd::setsid().map_err(ProcessError::Session)?;
        return Ok(Rebirth::Child);
    }

    let exe = env::current_exe().map_err(ProcessError::Spawn)?;
    let mut command = Command::new(exe);
    command
        .args(env::args_os().skip(1))
        .env(CHILD_MARKER, "1")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    if let Some(run_as) = run_as {
        command.uid(run_as.uid().as_raw()).gid(run_as.gid().as_raw());
    }

    let child = command.spawn().map_err(ProcessError::Spawn)?;
    Ok(Rebirth::Parent { pid: child.id() })
}
