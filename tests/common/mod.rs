//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use carbon_agent::lifecycle::{AppError, ManagedApplication, Shutdown};
use carbon_agent::logging::LogError;

/// Application double that records lifecycle calls.
#[derive(Debug, Default)]
pub struct FakeApp {
    pub starts: AtomicU32,
    pub reloads: AtomicU32,
    pub stops: AtomicU32,
    pub fail_reload: AtomicBool,
    /// Address probed from `graceful_stop`.
    pub probe: Mutex<Option<SocketAddr>>,
    /// Whether the probed address refused connections during `graceful_stop`.
    pub probe_closed: Mutex<Option<bool>>,
    stopped: Shutdown,
}

impl FakeApp {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ManagedApplication for FakeApp {
    fn parse_configuration(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn start(&self) -> Result<(), AppError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reload_configuration(&self) -> Result<(), AppError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reload.load(Ordering::SeqCst) {
            return Err(AppError::Level(LogError::Level {
                level: "verbose".into(),
                reason: "unknown level".into(),
            }));
        }
        Ok(())
    }

    fn graceful_stop(&self) {
        if let Some(addr) = *self.probe.lock() {
            *self.probe_closed.lock() = Some(TcpStream::connect(addr).is_err());
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.stopped.trigger();
    }

    fn run_until_stopped(&self) -> impl std::future::Future<Output = ()> + Send {
        let mut signal = self.stopped.subscribe();
        async move { signal.recv().await }
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// Async variant of [`wait_until`].
pub async fn wait_until_async(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}
