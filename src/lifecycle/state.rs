//! Lifecycle state tracking.

use std::fmt;

use serde::Serialize;
use tokio::sync::watch;

/// Where the daemon is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Configuring,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl LifecycleState {
    /// Whether `next` directly follows this state.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Configuring, Starting) | (Starting, Running) | (Running, Stopping) | (Stopping, Stopped)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Configuring => "configuring",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attempted transition that skips or reverses a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid lifecycle transition from {from} to {to}")]
pub struct TransitionError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Current lifecycle state, observable by other tasks.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    /// Start in [`LifecycleState::Configuring`].
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Configuring);
        Self { tx }
    }

    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Move to `next` if it directly follows the current state.
    pub fn advance(&self, next: LifecycleState) -> Result<(), TransitionError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                tracing::debug!(from = %state, to = %next, "Lifecycle transition");
                *state = next;
                true
            } else {
                result = Err(TransitionError {
                    from: *state,
                    to: next,
                });
                false
            }
        });
        result
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
