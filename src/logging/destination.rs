//! The process-wide log destination.
//!
//! # Responsibilities
//! - Own the active log filename and its append-mode handle
//! - Re-acquire the handle on demand (rotation signal, filesystem event)
//! - Hand out writers to the tracing subscriber
//! - Own the external-change subscription for the active file
//!
//! # Design Decisions
//! - Filename, handle and generation form one immutable `Target`,
//!   published through `ArcSwap` so readers never see a mismatched pair
//! - `open` and `reopen` serialize on one guard; writers never take it
//! - Each log event writes to a single snapshot; a replaced file is closed
//!   when the last snapshot referencing it is dropped

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

use crate::logging::watcher::{self, WatchSubscription};
use crate::logging::LogError;

/// Permission bits for log files created by the daemon.
pub const LOG_FILE_MODE: u32 = 0o644;

#[derive(Debug)]
enum Sink {
    Stderr,
    File(File),
}

#[derive(Debug)]
struct Target {
    filename: String,
    sink: Sink,
    generation: u64,
}

impl Target {
    fn stderr(filename: String, generation: u64) -> Self {
        Self {
            filename,
            sink: Sink::Stderr,
            generation,
        }
    }
}

/// Published filename/handle pair plus the reopen guard.
///
/// Shared between the destination and its watcher thread.
#[derive(Debug)]
pub(crate) struct Output {
    current: ArcSwap<Target>,
    guard: Mutex<()>,
}

impl Output {
    pub(crate) fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Target::stderr(String::new(), 0)),
            guard: Mutex::new(()),
        }
    }

    /// Point at `filename` and acquire its first handle.
    ///
    /// The filename is recorded even when the open fails; output then
    /// falls back to stderr until a later reopen succeeds.
    pub(crate) fn retarget(&self, filename: &str) -> Result<(), LogError> {
        let _guard = self.guard.lock();
        let previous = self.current.load();
        let generation = previous.generation;

        match open_sink(filename) {
            Ok(sink) => {
                self.current.store(Arc::new(Target {
                    filename: filename.to_owned(),
                    sink,
                    generation: generation + 1,
                }));
                Ok(())
            }
            Err(source) => {
                self.current
                    .store(Arc::new(Target::stderr(filename.to_owned(), generation)));
                Err(LogError::Open {
                    filename: filename.to_owned(),
                    source,
                })
            }
        }
    }

    /// Re-acquire a handle for the current filename.
    pub(crate) fn reopen(&self) -> Result<(), LogError> {
        let _guard = self.guard.lock();
        let current = self.current.load_full();

        let sink = open_sink(&current.filename).map_err(|source| LogError::Reopen {
            filename: current.filename.clone(),
            source,
        })?;

        self.current.store(Arc::new(Target {
            filename: current.filename.clone(),
            sink,
            generation: current.generation + 1,
        }));
        // `current` still holds the old handle; it closes once in-flight
        // writers release their snapshots as well.
        Ok(())
    }

    pub(crate) fn filename(&self) -> String {
        self.current.load().filename.clone()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.current.load().generation
    }

    fn writes_to_stderr(&self) -> bool {
        matches!(self.current.load().sink, Sink::Stderr)
    }

    /// Whether the filename no longer names the file behind the handle.
    ///
    /// True when the path is missing, points at another inode, or a file
    /// target is currently falling back to stderr.
    pub(crate) fn is_detached(&self) -> bool {
        let current = self.current.load();
        let file = match &current.sink {
            Sink::File(file) => file,
            Sink::Stderr => return !current.filename.is_empty(),
        };

        match (fs::metadata(&current.filename), file.metadata()) {
            (Ok(on_disk), Ok(open)) => on_disk.dev() != open.dev() || on_disk.ino() != open.ino(),
            _ => true,
        }
    }
}

fn open_sink(filename: &str) -> io::Result<Sink> {
    if filename.is_empty() {
        return Ok(Sink::Stderr);
    }

    OpenOptions::new()
        .read(true)
        .create(true)
        .append(true)
        .mode(LOG_FILE_MODE)
        .open(filename)
        .map(Sink::File)
}

/// The single writable sink for process diagnostics.
///
/// Created empty (writing to stderr), then pointed at a file with
/// [`LogDestination::open`]. All log output goes through [`LogWriter`]s
/// obtained from [`LogDestination::writer`].
#[derive(Debug)]
pub struct LogDestination {
    output: Arc<Output>,
    subscription: Mutex<Option<WatchSubscription>>,
}

impl LogDestination {
    /// Create a destination that writes to stderr.
    pub fn new() -> Self {
        Self {
            output: Arc::new(Output::new()),
            subscription: Mutex::new(None),
        }
    }

    /// Point logging at `filename`.
    ///
    /// Performs the initial reopen, cancels any previous filesystem
    /// subscription and starts a new one for `filename`. An empty filename
    /// sends output to stderr without a subscription. The returned error
    /// comes from the initial reopen; logging continues on stderr.
    pub fn open(&self, filename: &str) -> Result<(), LogError> {
        let result = self.output.retarget(filename);

        let mut subscription = self.subscription.lock();
        if let Some(previous) = subscription.take() {
            previous.cancel();
        }
        if !filename.is_empty() {
            *subscription = watcher::subscribe(Arc::clone(&self.output), filename);
        }

        result
    }

    /// Re-acquire a handle for the current filename.
    ///
    /// On failure the previous handle stays in place and keeps receiving
    /// writes. Safe to call concurrently with itself and with log writes.
    /// A successful reopen starts the filesystem subscription if none is
    /// live, e.g. because the file did not exist at `open`.
    pub fn reopen(&self) -> Result<(), LogError> {
        self.output.reopen()?;

        let filename = self.output.filename();
        if !filename.is_empty() {
            let mut subscription = self.subscription.lock();
            if subscription.is_none() {
                *subscription = watcher::subscribe(Arc::clone(&self.output), &filename);
            }
        }
        Ok(())
    }

    /// The current target filename (empty means stderr).
    pub fn filename(&self) -> String {
        self.output.filename()
    }

    /// Number of successful handle acquisitions so far.
    pub fn generation(&self) -> u64 {
        self.output.generation()
    }

    /// Whether output currently goes to stderr.
    pub fn writes_to_stderr(&self) -> bool {
        self.output.writes_to_stderr()
    }

    /// Whether an external-change subscription is live.
    pub fn is_watching(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// A writer factory for `tracing_subscriber::fmt`.
    pub fn writer(&self) -> LogWriter {
        LogWriter {
            output: Arc::clone(&self.output),
        }
    }
}

impl Default for LogDestination {
    fn default() -> Self {
        Self::new()
    }
}

/// `MakeWriter` handle onto a [`LogDestination`].
#[derive(Debug, Clone)]
pub struct LogWriter {
    output: Arc<Output>,
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = SnapshotWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SnapshotWriter {
            target: self.output.current.load_full(),
        }
    }
}

/// Writer bound to the target that was current when it was created.
#[derive(Debug)]
pub struct SnapshotWriter {
    target: Arc<Target>,
}

impl Write for SnapshotWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.target.sink {
            Sink::Stderr => io::stderr().write(buf),
            Sink::File(file) => (&*file).write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match &self.target.sink {
            Sink::Stderr => io::stderr().lock().write_all(buf),
            Sink::File(file) => (&*file).write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.target.sink {
            Sink::Stderr => io::stderr().flush(),
            Sink::File(file) => (&*file).flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::thread;

    fn write_line(destination: &LogDestination, line: &str) {
        let writer = destination.writer();
        let mut snapshot = writer.make_writer();
        snapshot.write_all(format!("{line}\n").as_bytes()).unwrap();
    }

    #[test]
    fn empty_filename_writes_to_stderr_without_subscription() {
        let destination = LogDestination::new();
        destination.open("").unwrap();

        assert!(destination.writes_to_stderr());
        assert!(!destination.is_watching());
        assert_eq!(destination.filename(), "");
        write_line(&destination, "to stderr");
    }

    #[test]
    fn open_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "existing\n").unwrap();

        let destination = LogDestination::new();
        destination.open(path.to_str().unwrap()).unwrap();
        write_line(&destination, "A");

        assert!(!destination.writes_to_stderr());
        assert_eq!(destination.generation(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nA\n");
    }

    #[test]
    fn reopen_after_rename_targets_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let rotated = dir.path().join("app.log.1");

        let destination = LogDestination::new();
        destination.open(path.to_str().unwrap()).unwrap();
        write_line(&destination, "A");

        fs::rename(&path, &rotated).unwrap();
        destination.reopen().unwrap();
        write_line(&destination, "B");

        assert_eq!(fs::read_to_string(&rotated).unwrap(), "A\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "B\n");
    }

    #[test]
    fn failed_open_records_filename_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("app.log");
        let filename = path.to_str().unwrap();

        let destination = LogDestination::new();
        let err = destination.open(filename).unwrap_err();

        assert!(matches!(err, LogError::Open { .. }));
        assert_eq!(destination.filename(), filename);
        assert!(destination.writes_to_stderr());
        assert_eq!(destination.generation(), 0);

        assert!(!destination.is_watching());

        fs::create_dir(dir.path().join("missing")).unwrap();
        destination.reopen().unwrap();
        assert!(!destination.writes_to_stderr());
        assert!(destination.is_watching());
    }

    #[test]
    fn detects_removed_and_replaced_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let output = Output::new();
        output.retarget(path.to_str().unwrap()).unwrap();
        assert!(!output.is_detached());

        // Metadata changes on the same inode do not detach.
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        assert!(!output.is_detached());

        fs::remove_file(&path).unwrap();
        assert!(output.is_detached());
        output.reopen().unwrap();
        assert!(!output.is_detached());

        let replacement = dir.path().join("app.log.new");
        fs::write(&replacement, "").unwrap();
        fs::rename(&replacement, &path).unwrap();
        assert!(output.is_detached());
        output.reopen().unwrap();
        assert!(!output.is_detached());
    }

    #[test]
    fn empty_target_is_never_detached() {
        let output = Output::new();
        assert!(!output.is_detached());
    }

    #[test]
    fn failed_reopen_keeps_previous_handle() {
        let root = tempfile::tempdir().unwrap();
        let log_dir = root.path().join("logs");
        let moved_dir = root.path().join("logs.old");
        fs::create_dir(&log_dir).unwrap();
        let path = log_dir.join("app.log");

        let destination = LogDestination::new();
        destination.open(path.to_str().unwrap()).unwrap();
        write_line(&destination, "A");

        fs::rename(&log_dir, &moved_dir).unwrap();
        let err = destination.reopen().unwrap_err();
        assert!(matches!(err, LogError::Reopen { .. }));
        assert!(err.to_string().contains("app.log"));

        // Still writing through the old handle.
        write_line(&destination, "B");
        assert_eq!(
            fs::read_to_string(moved_dir.join("app.log")).unwrap(),
            "A\nB\n"
        );

        fs::create_dir(&log_dir).unwrap();
        destination.reopen().unwrap();
        write_line(&destination, "C");
        assert_eq!(fs::read_to_string(&path).unwrap(), "C\n");
    }

    #[test]
    fn concurrent_reopens_never_lose_or_split_lines() {
        const WRITERS: usize = 4;
        const LINES: usize = 500;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let destination = Arc::new(LogDestination::new());
        destination.open(path.to_str().unwrap()).unwrap();

        let reopener = {
            let destination = Arc::clone(&destination);
            thread::spawn(move || {
                for _ in 0..200 {
                    destination.reopen().unwrap();
                }
            })
        };

        let writers: Vec<_> = (0..WRITERS)
            .map(|id| {
                let destination = Arc::clone(&destination);
                thread::spawn(move || {
                    for n in 0..LINES {
                        write_line(&destination, &format!("writer-{id} line-{n:04} end"));
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        reopener.join().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), WRITERS * LINES);
        assert!(lines
            .iter()
            .all(|line| line.starts_with("writer-") && line.ends_with(" end")));
        assert!(destination.generation() >= 201);
    }
}
