//! The managed application.
//!
//! # Responsibilities
//! - Own the active configuration and swap it on reload
//! - Re-apply the log level after each reload
//! - Report periodic stats until asked to stop
//!
//! # Design Decisions
//! - Configuration is published through `ArcSwap`; readers never block
//! - A failed reload leaves the previous configuration active
//! - The log file path is fixed for the life of the process

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::config::{load_or_default, AgentConfig};
use crate::lifecycle::{AppError, ManagedApplication, Shutdown, ShutdownSignal};
use crate::logging::LevelHandle;

/// State shared with the stats task.
#[derive(Debug)]
struct Shared {
    config: ArcSwap<AgentConfig>,
    reloads: AtomicU64,
    started_at: Instant,
}

impl Shared {
    fn interval(&self) -> Duration {
        Duration::from_secs(self.config.load().common.metric_interval_secs.max(1))
    }
}

/// The carbon agent.
#[derive(Debug)]
pub struct Agent {
    config_path: Option<PathBuf>,
    shared: Arc<Shared>,
    levels: Option<LevelHandle>,
    shutdown: Shutdown,
    worker: Mutex<Option<JoinHandle<()>>>,
    started: Mutex<bool>,
}

impl Agent {
    /// Create an agent reading `config_path`, or the defaults when `None`.
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            shared: Arc::new(Shared {
                config: ArcSwap::from_pointee(AgentConfig::default()),
                reloads: AtomicU64::new(0),
                started_at: Instant::now(),
            }),
            levels: None,
            shutdown: Shutdown::new(),
            worker: Mutex::new(None),
            started: Mutex::new(false),
        }
    }

    /// Apply the configured log level through `levels` on every reload.
    pub fn with_levels(mut self, levels: LevelHandle) -> Self {
        self.levels = Some(levels);
        self
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> Arc<AgentConfig> {
        self.shared.config.load_full()
    }

    /// Number of successful reloads.
    pub fn reload_count(&self) -> u64 {
        self.shared.reloads.load(Ordering::Relaxed)
    }
}

impl ManagedApplication for Agent {
    fn parse_configuration(&self) -> Result<(), AppError> {
        let config = load_or_default(self.config_path.as_deref())?;
        self.shared.config.store(Arc::new(config));
        Ok(())
    }

    fn start(&self) -> Result<(), AppError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::Runtime(e.to_string()))?;

        let mut started = self.started.lock();
        if *started {
            return Err(AppError::AlreadyStarted);
        }
        *started = true;

        let worker = runtime.spawn(report_stats(
            Arc::clone(&self.shared),
            self.shutdown.subscribe(),
        ));
        *self.worker.lock() = Some(worker);
        Ok(())
    }

    fn reload_configuration(&self) -> Result<(), AppError> {
        let next = load_or_default(self.config_path.as_deref())?;
        if let Some(levels) = &self.levels {
            levels.set_level(&next.common.log_level)?;
        }

        let previous = self.shared.config.swap(Arc::new(next));
        let current = self.shared.config.load();
        if previous.common.logfile != current.common.logfile {
            tracing::warn!(
                active = %previous.common.logfile,
                configured = %current.common.logfile,
                "Log file path changes take effect on restart"
            );
        }

        self.shared.reloads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn graceful_stop(&self) {
        if !self.shutdown.trigger() {
            tracing::debug!("Agent stop already requested");
        }
    }

    fn run_until_stopped(&self) -> impl Future<Output = ()> + Send {
        let worker = self.worker.lock().take();
        async move {
            if let Some(worker) = worker {
                if let Err(e) = worker.await {
                    tracing::warn!(error = %e, "Agent task ended abnormally");
                }
            }
        }
    }
}

/// Periodic stats line, rescheduled when the interval is reconfigured.
async fn report_stats(shared: Arc<Shared>, mut shutdown: ShutdownSignal) {
    let mut period = shared.interval();
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tracing::info!(
                    uptime_secs = shared.started_at.elapsed().as_secs(),
                    reloads = shared.reloads.load(Ordering::Relaxed),
                    "Agent stats"
                );

                let next = shared.interval();
                if next != period {
                    period = next;
                    ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Agent stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("agent.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn parses_configuration_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[common]\nmax_cpu = 4\nlogfile = \"\"\n");

        let agent = Agent::new(Some(path));
        agent.parse_configuration().unwrap();
        assert_eq!(agent.config().common.max_cpu, 4);
        assert_eq!(agent.config().common.logfile, "");
    }

    #[test]
    fn defaults_without_a_path() {
        let agent = Agent::new(None);
        agent.parse_configuration().unwrap();
        assert_eq!(*agent.config(), AgentConfig::default());
    }

    #[test]
    fn failed_reload_keeps_previous_configuration() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[common]\nmetric_interval_secs = 5\n");
        let agent = Agent::new(Some(path.clone()));
        agent.parse_configuration().unwrap();

        fs::write(&path, "[common]\nmax_cpu = 0\n").unwrap();
        assert!(matches!(agent.reload_configuration(), Err(AppError::Config(_))));
        assert_eq!(agent.config().common.metric_interval_secs, 5);
        assert_eq!(agent.reload_count(), 0);

        fs::write(&path, "[common]\nmetric_interval_secs = 9\n").unwrap();
        agent.reload_configuration().unwrap();
        assert_eq!(agent.config().common.metric_interval_secs, 9);
        assert_eq!(agent.reload_count(), 1);
    }

    #[test]
    fn start_requires_a_runtime() {
        let agent = Agent::new(None);
        assert!(matches!(agent.start(), Err(AppError::Runtime(_))));
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let agent = Agent::new(None);
        agent.start().unwrap();
        assert!(matches!(agent.start(), Err(AppError::AlreadyStarted)));
        agent.graceful_stop();
        agent.run_until_stopped().await;
    }

    #[tokio::test]
    async fn graceful_stop_ends_the_worker() {
        let agent = Agent::new(None);
        agent.start().unwrap();
        let stopped = agent.run_until_stopped();

        agent.graceful_stop();
        agent.graceful_stop();
        tokio::time::timeout(Duration::from_secs(1), stopped)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn run_until_stopped_without_start_returns() {
        let agent = Agent::new(None);
        tokio::time::timeout(Duration::from_secs(1), agent.run_until_stopped())
            .await
            .unwrap();
    }
}
