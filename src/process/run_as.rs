//! Run-as identity resolution.

use nix::unistd::{Gid, Uid, User};

use crate::process::ProcessError;

/// A resolved system user the daemon should run as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunAs {
    name: String,
    uid: Uid,
    gid: Gid,
}

impl RunAs {
    pub fn new(name: impl Into<String>, uid: Uid, gid: Gid) -> Self {
        Self {
            name: name.into(),
            uid,
            gid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Primary group of the user.
    pub fn gid(&self) -> Gid {
        self.gid
    }
}

/// Resolve a configured user name. An empty name means "do not switch".
pub fn resolve_user(name: &str) -> Result<Option<RunAs>, ProcessError> {
    if name.is_empty() {
        return Ok(None);
    }

    match User::from_name(name) {
        Ok(Some(user)) => Ok(Some(RunAs::new(user.name, user.uid, user.gid))),
        Ok(None) => Err(ProcessError::UnknownUser(name.to_owned())),
        Err(source) => Err(ProcessError::Lookup {
            name: name.to_owned(),
            source,
        }),
    }
}
