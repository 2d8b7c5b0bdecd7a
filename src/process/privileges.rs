//! Foreground privilege drop.

use nix::unistd::{setgid, setgroups, setuid, Uid};

use crate::process::{ProcessError, RunAs};

/// Switch the process to `run_as`.
///
/// A no-op when already running as that user. Without root privileges the
/// switch is impossible; the daemon keeps its current identity and says so.
pub fn drop_privileges(run_as: &RunAs) -> Result<(), ProcessError> {
    let current = Uid::effective();
    if current == run_as.uid() {
        tracing::debug!(user = %run_as.name(), "Already running as configured user");
        return Ok(());
    }
    if !current.is_root() {
        tracing::warn!(
            user = %run_as.name(),
            uid = current.as_raw(),
            "Not running as root, keeping current user"
        );
        return Ok(());
    }

    let privileges_err = |source| ProcessError::Privileges {
        name: run_as.name().to_owned(),
        source,
    };

    // Group first: after setuid we could no longer change it.
    setgroups(&[run_as.gid()]).map_err(privileges_err)?;
    setgid(run_as.gid()).map_err(privileges_err)?;
    setuid(run_as.uid()).map_err(privileges_err)?;

    tracing::info!(
        user = %run_as.name(),
        uid = run_as.uid().as_raw(),
        gid = run_as.gid().as_raw(),
        "Dropped privileges"
    );
    Ok(())
}
