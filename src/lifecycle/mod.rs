//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Parse config → Resolve user → Set level → Prepare + open log
//!     → Daemonize / drop privileges → Diagnostics → Start application
//!
//! Signals (signals.rs, orchestrator.rs):
//!     SIGHUP  → Reopen log + reload application config
//!     SIGUSR2 → Stop diagnostics → Graceful application stop
//!
//! State (state.rs):
//!     Configuring → Starting → Running → Stopping → Stopped
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then log, then background, then application
//! - Startup is sequential; only signal handling after startup is concurrent
//! - Reopen and reload on SIGHUP succeed or fail independently

pub mod app;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use app::{AppError, ManagedApplication};
pub use orchestrator::{Orchestrator, RotationOutcome};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::SignalSource;
pub use startup::{StartupError, StartupOptions};
pub use state::{Lifecycle, LifecycleState, TransitionError};
