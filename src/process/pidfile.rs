//! Pidfile for the background daemon.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::process::ProcessError;

const PIDFILE_MODE: u32 = 0o644;

/// A pidfile holding the current process id, removed on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current pid to `path`, replacing any previous content.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ProcessError> {
        let path = path.as_ref().to_path_buf();
        let pidfile_err = |source| ProcessError::PidFile {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(PIDFILE_MODE)
            .open(&path)
            .map_err(pidfile_err)?;
        writeln!(file, "{}", std::process::id()).map_err(pidfile_err)?;

        tracing::debug!(path = %path.display(), "Pidfile written");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove pidfile");
        }
    }
}
