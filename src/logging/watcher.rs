//! External log rotation detection.
//!
//! # Responsibilities
//! - Watch exactly the active log path for create, delete and rename
//! - Reopen the destination when the path no longer names the open file
//! - Re-establish the watch after every event (the old inode may be gone)
//!
//! # Design Decisions
//! - One worker thread per subscription, blocked on "next event or cancel"
//! - Events are handled one at a time: reopen, log, then re-subscribe
//! - An event only triggers a reopen once the path and the open handle
//!   disagree on (device, inode)
//! - Watch failures disable the feature; they never stop the daemon

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::logging::destination::Output;

/// Errors from the filesystem watch layer.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to create filesystem watcher: {0}")]
    Backend(#[source] notify::Error),

    #[error("failed to watch {}: {source}", path.display())]
    Subscribe { path: PathBuf, source: notify::Error },

    #[error("failed to unwatch {}: {source}", path.display())]
    Unsubscribe { path: PathBuf, source: notify::Error },

    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A source of filesystem notifications for a single path.
pub trait WatchBackend: Send + 'static {
    /// Register interest in `path` only, not its directory tree.
    fn subscribe(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Drop interest in `path`.
    fn unsubscribe(&mut self, path: &Path) -> Result<(), WatchError>;
}

impl WatchBackend for RecommendedWatcher {
    fn subscribe(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Subscribe {
                path: path.to_path_buf(),
                source,
            })
    }

    fn unsubscribe(&mut self, path: &Path) -> Result<(), WatchError> {
        self.unwatch(path).map_err(|source| WatchError::Unsubscribe {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Whether an event may mean the file at the watched path was replaced.
///
/// Metadata counts because an unlink of a file we hold open is reported
/// only as a link-count change. Content changes (our own appends) do not.
pub fn is_rotation_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Metadata(_))
    )
}

/// A live watch on the active log path.
///
/// Dropping or cancelling the subscription stops the worker thread and
/// releases the underlying watch before returning.
#[derive(Debug)]
pub struct WatchSubscription {
    path: PathBuf,
    cancel: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl WatchSubscription {
    /// The watched path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop watching and wait for the worker to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // The worker may already have exited on its own.
        let _ = self.cancel.send(());
        if worker.join().is_err() {
            tracing::warn!(path = %self.path.display(), "Log watcher thread panicked");
        }
        tracing::debug!(path = %self.path.display(), "Log watcher stopped");
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start watching `filename` with the platform watcher.
///
/// Returns `None` (after logging a warning) when watching is unavailable.
pub(crate) fn subscribe(output: Arc<Output>, filename: &str) -> Option<WatchSubscription> {
    let (event_tx, event_rx) = crossbeam_channel::unbounded();

    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        },
        Config::default(),
    )
    .map_err(WatchError::Backend);

    let started = watcher
        .and_then(|watcher| spawn(output, watcher, event_rx, PathBuf::from(filename)));

    match started {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            tracing::warn!(
                filename = %filename,
                error = %e,
                "External log rotation will not be detected"
            );
            None
        }
    }
}

/// Subscribe `backend` to `path` and run the event loop on a new thread.
pub(crate) fn spawn<B: WatchBackend>(
    output: Arc<Output>,
    mut backend: B,
    events: Receiver<notify::Result<Event>>,
    path: PathBuf,
) -> Result<WatchSubscription, WatchError> {
    backend.subscribe(&path)?;

    let (cancel_tx, cancel_rx) = crossbeam_channel::bounded(1);
    let worker_path = path.clone();
    let worker = thread::Builder::new()
        .name("log-watcher".into())
        .spawn(move || run(output, backend, events, cancel_rx, worker_path))
        .map_err(WatchError::Spawn)?;

    tracing::debug!(path = %path.display(), "Log watcher started");

    Ok(WatchSubscription {
        path,
        cancel: cancel_tx,
        worker: Some(worker),
    })
}

fn run<B: WatchBackend>(
    output: Arc<Output>,
    mut backend: B,
    events: Receiver<notify::Result<Event>>,
    cancel: Receiver<()>,
    path: PathBuf,
) {
    loop {
        crossbeam_channel::select! {
            recv(cancel) -> _ => break,
            recv(events) -> message => match message {
                Ok(Ok(event)) if is_rotation_event(&event.kind) => {
                    if output.is_detached() {
                        handle_rotation(&output, &mut backend, &path, event.kind);
                    } else {
                        tracing::trace!(event = ?event.kind, "Log file unchanged");
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::warn!(path = %path.display(), error = %e, "Log watch error");
                }
                Err(_) => break,
            },
        }
    }
    // `backend` drops here, releasing the watch.
}

fn handle_rotation<B: WatchBackend>(output: &Output, backend: &mut B, path: &Path, kind: EventKind) {
    match output.reopen() {
        Ok(()) => tracing::info!(
            filename = %output.filename(),
            event = ?kind,
            "Reopened log after filesystem event"
        ),
        Err(e) => tracing::error!(
            filename = %output.filename(),
            event = ?kind,
            error = %e,
            "Reopen log after filesystem event failed"
        ),
    }

    // The previous watch may already be gone with the old inode.
    if let Err(e) = backend.unsubscribe(path) {
        tracing::debug!(error = %e, "Stale log watch not removed");
    }
    if let Err(e) = backend.subscribe(path) {
        tracing::warn!(error = %e, "Log watch not re-established");
    }
}
