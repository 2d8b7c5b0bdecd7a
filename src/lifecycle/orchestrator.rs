//! Signal-driven orchestration of the running daemon.
//!
//! # Responsibilities
//! - Transition Starting → Running by starting the application
//! - Map the rotation signal to log reopen + configuration reload
//! - Map the terminal signal to diagnostics stop + graceful stop
//! - Wait for the application and record the final state
//!
//! # Design Decisions
//! - One task per signal listener; no locking between them
//! - Reopen and reload outcomes are logged and returned separately
//! - The diagnostics listener is closed before the graceful stop starts

use std::sync::Arc;

use crate::diagnostics::DiagnosticsServer;
use crate::lifecycle::app::{AppError, ManagedApplication};
use crate::lifecycle::signals::SignalSource;
use crate::lifecycle::startup::StartupError;
use crate::lifecycle::state::{Lifecycle, LifecycleState, TransitionError};
use crate::logging::{LogDestination, LogError};

/// Result of handling one rotation signal.
#[derive(Debug)]
pub struct RotationOutcome {
    pub reopen: Result<(), LogError>,
    pub reload: Result<(), AppError>,
}

impl RotationOutcome {
    pub fn is_ok(&self) -> bool {
        self.reopen.is_ok() && self.reload.is_ok()
    }
}

/// Drives a [`ManagedApplication`] from OS signals.
pub struct Orchestrator<A> {
    lifecycle: Lifecycle,
    destination: Arc<LogDestination>,
    app: Arc<A>,
    diagnostics: Option<DiagnosticsServer>,
}

impl<A: ManagedApplication> Orchestrator<A> {
    pub fn new(lifecycle: Lifecycle, destination: Arc<LogDestination>, app: Arc<A>) -> Self {
        Self {
            lifecycle,
            destination,
            app,
            diagnostics: None,
        }
    }

    /// Attach a running diagnostics endpoint, stopped on the terminal signal.
    pub fn with_diagnostics(mut self, server: DiagnosticsServer) -> Self {
        self.diagnostics = Some(server);
        self
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn diagnostics(&self) -> Option<&DiagnosticsServer> {
        self.diagnostics.as_ref()
    }

    /// Start the application and enter [`LifecycleState::Running`].
    pub fn start(&self) -> Result<(), StartupError> {
        let current = self.lifecycle.current();
        if !current.can_transition_to(LifecycleState::Running) {
            return Err(TransitionError {
                from: current,
                to: LifecycleState::Running,
            }
            .into());
        }

        self.app.start()?;
        self.lifecycle.advance(LifecycleState::Running)?;
        tracing::info!("started");
        Ok(())
    }

    /// Handle the rotation signal: reopen the log, then reload configuration.
    ///
    /// Neither failure prevents the other step.
    pub fn rotate(&self) -> RotationOutcome {
        let reopen = self.destination.reopen();
        match &reopen {
            Ok(()) => tracing::info!(
                filename = %self.destination.filename(),
                "HUP received, log reopened"
            ),
            Err(e) => tracing::error!(
                filename = %self.destination.filename(),
                error = %e,
                "HUP received, log reopen failed"
            ),
        }

        tracing::info!("HUP received, reloading configuration");
        let reload = self.app.reload_configuration();
        match &reload {
            Ok(()) => tracing::info!("Configuration successfully reloaded"),
            Err(e) => tracing::error!(error = %e, "Configuration reload failed"),
        }

        RotationOutcome { reopen, reload }
    }

    /// Handle the terminal signal.
    ///
    /// Closes the diagnostics listener first, then asks the application to
    /// stop; the application finishes in-flight work on its own schedule.
    pub async fn stop(&self) {
        if let Err(e) = self.lifecycle.advance(LifecycleState::Stopping) {
            tracing::warn!(error = %e, "Stop requested outside the running state");
        }

        if let Some(diagnostics) = &self.diagnostics {
            diagnostics.stop().await;
        }

        tracing::info!("Stopping application gracefully");
        self.app.graceful_stop();
    }

    /// Listen for signals until the application has stopped.
    pub async fn run<R, T>(self: Arc<Self>, rotation: R, terminal: T)
    where
        R: SignalSource,
        T: SignalSource,
    {
        let rotation_task = tokio::spawn(listen_rotation(Arc::clone(&self), rotation));
        let terminal_task = tokio::spawn(listen_terminal(Arc::clone(&self), terminal));

        self.app.run_until_stopped().await;

        rotation_task.abort();
        terminal_task.abort();

        if self.lifecycle.current() == LifecycleState::Running {
            // The application finished without a stop signal.
            let _ = self.lifecycle.advance(LifecycleState::Stopping);
        }
        if let Err(e) = self.lifecycle.advance(LifecycleState::Stopped) {
            tracing::warn!(error = %e, "Unexpected lifecycle state at exit");
        }
        tracing::info!("stopped");
    }
}

async fn listen_rotation<A: ManagedApplication, R: SignalSource>(
    orchestrator: Arc<Orchestrator<A>>,
    mut signals: R,
) {
    while signals.recv().await.is_some() {
        orchestrator.rotate();
    }
    tracing::debug!("Rotation signal stream closed");
}

async fn listen_terminal<A: ManagedApplication, T: SignalSource>(
    orchestrator: Arc<Orchestrator<A>>,
    mut signals: T,
) {
    if signals.recv().await.is_some() {
        tracing::info!("Stop signal received");
        orchestrator.stop().await;
    }
}
