//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and install logging before anything else
//! - Prepare and open the log file as its eventual owner
//! - Daemonize or drop privileges, then build the runtime
//! - Register signals, start diagnostics and the application
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The runtime is built after daemonizing so no worker threads are lost

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::Agent;
use crate::config::DiagnosticsConfig;
use crate::diagnostics::{DiagnosticsError, DiagnosticsServer, DiagnosticsState};
use crate::lifecycle::app::{AppError, ManagedApplication};
use crate::lifecycle::orchestrator::Orchestrator;
use crate::lifecycle::signals;
use crate::lifecycle::state::{Lifecycle, LifecycleState, TransitionError};
use crate::logging::{self, LogDestination, LogError};
use crate::process::{self, PidFile, ProcessError, Rebirth};

/// Command-line choices that shape startup.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// Configuration file; built-in defaults when `None`.
    pub config_path: Option<PathBuf>,
    /// Validate configuration and exit.
    pub check_config: bool,
    /// Continue in a background child process.
    pub daemon: bool,
    /// Pid file written by the background child.
    pub pidfile: Option<PathBuf>,
}

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Lifecycle(#[from] TransitionError),

    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),

    #[error("failed to build runtime: {0}")]
    Runtime(io::Error),

    #[error("failed to register signal handlers: {0}")]
    Signals(io::Error),
}

/// Run the daemon to completion.
pub fn run(options: StartupOptions) -> Result<(), StartupError> {
    let lifecycle = Lifecycle::new();
    let destination = Arc::new(LogDestination::new());

    // Logging is installed even when parsing fails, so the error is reported.
    let agent = Agent::new(options.config_path.clone());
    let parsed = agent.parse_configuration();
    let config = agent.config();
    let levels = logging::init(
        &destination,
        &config.common.log_level,
        config.common.log_format,
    )?;
    parsed?;
    let agent = agent.with_levels(levels);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?options.config_path,
        "carbon-agent starting"
    );

    let run_as = process::resolve_user(&config.common.user)?;

    if options.check_config {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    logging::prepare_file(&config.common.logfile, run_as.as_ref())?;
    destination.open(&config.common.logfile)?;
    lifecycle.advance(LifecycleState::Starting)?;

    let _pidfile = if options.daemon {
        match process::reborn(run_as.as_ref())? {
            Rebirth::Parent { pid } => {
                tracing::info!(pid, "Continuing in background");
                return Ok(());
            }
            Rebirth::Child => options.pidfile.as_deref().map(PidFile::create).transpose()?,
        }
    } else {
        if let Some(run_as) = &run_as {
            process::drop_privileges(run_as)?;
        }
        None
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.common.max_cpu)
        .thread_name("carbon-agent-worker")
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;

    tracing::info!(
        worker_threads = config.common.max_cpu,
        logfile = %destination.filename(),
        "Runtime ready"
    );

    runtime.block_on(serve(
        lifecycle,
        destination,
        Arc::new(agent),
        &config.diagnostics,
    ))
}

async fn serve<A: ManagedApplication>(
    lifecycle: Lifecycle,
    destination: Arc<LogDestination>,
    app: Arc<A>,
    diagnostics: &DiagnosticsConfig,
) -> Result<(), StartupError> {
    let rotation = signals::rotation_signal().map_err(StartupError::Signals)?;
    let terminal = signals::terminal_signal().map_err(StartupError::Signals)?;

    let mut orchestrator = Orchestrator::new(lifecycle, Arc::clone(&destination), app);
    if diagnostics.enabled {
        let state = DiagnosticsState::new(destination, orchestrator.lifecycle().subscribe());
        let server = DiagnosticsServer::start(&diagnostics.listen, state).await?;
        orchestrator = orchestrator.with_diagnostics(server);
    }

    orchestrator.start()?;
    Arc::new(orchestrator).run(rotation, terminal).await;
    Ok(())
}
