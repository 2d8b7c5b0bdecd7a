//! OS signal handling.
//!
//! # Responsibilities
//! - Register the rotation (SIGHUP) and terminal (SIGUSR2) handlers
//! - Present OS signals and synthetic test triggers behind one trait
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers log reopen and config reload, not shutdown
//! - SIGINT/SIGTERM keep their default disposition

use std::future::Future;
use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;

/// A stream of signal deliveries.
///
/// `recv` resolves to `None` once no further deliveries are possible.
pub trait SignalSource: Send + 'static {
    fn recv(&mut self) -> impl Future<Output = Option<()>> + Send;
}

impl SignalSource for Signal {
    fn recv(&mut self) -> impl Future<Output = Option<()>> + Send {
        Signal::recv(self)
    }
}

/// Synthetic signals, used to drive the orchestrator in tests.
impl SignalSource for mpsc::Receiver<()> {
    fn recv(&mut self) -> impl Future<Output = Option<()>> + Send {
        mpsc::Receiver::recv(self)
    }
}

/// Handler for the log-rotation signal (SIGHUP).
pub fn rotation_signal() -> io::Result<Signal> {
    signal(SignalKind::hangup())
}

/// Handler for the graceful-stop signal (SIGUSR2).
pub fn terminal_signal() -> io::Result<Signal> {
    signal(SignalKind::user_defined2())
}
