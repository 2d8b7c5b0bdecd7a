//! Log file preparation before the first open.
//!
//! Creates the parent directories, makes sure the file exists with mode
//! `0644`, and hands it to the run-as user so reopens keep working after
//! privileges are dropped.

use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

use crate::logging::destination::LOG_FILE_MODE;
use crate::logging::LogError;
use crate::process::RunAs;

const LOG_DIR_MODE: u32 = 0o755;

/// Prepare `filename` for logging. An empty filename is a no-op.
pub fn prepare_file(filename: &str, owner: Option<&RunAs>) -> Result<(), LogError> {
    if filename.is_empty() {
        return Ok(());
    }

    let path = Path::new(filename);
    let prepare_err = |source| LogError::Prepare {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        DirBuilder::new()
            .recursive(true)
            .mode(LOG_DIR_MODE)
            .create(parent)
            .map_err(prepare_err)?;
    }

    OpenOptions::new()
        .read(true)
        .create(true)
        .append(true)
        .mode(LOG_FILE_MODE)
        .open(path)
        .map_err(prepare_err)?;

    fs::set_permissions(path, Permissions::from_mode(LOG_FILE_MODE)).map_err(prepare_err)?;

    if let Some(owner) = owner {
        nix::unistd::chown(path, Some(owner.uid()), Some(owner.gid())).map_err(|source| {
            LogError::Chown {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }

    Ok(())
}
