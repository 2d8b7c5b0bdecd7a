//! Global subscriber writing through the log destination.
//!
//! Installs a process-wide subscriber, so it lives in its own test binary.

use std::time::Duration;

use tempfile::TempDir;

use carbon_agent::config::LogFormat;
use carbon_agent::logging::{self, LogDestination, LogError};

mod common;
use common::{read, wait_until};

#[test]
fn level_changes_apply_to_file_output() {
    std::env::remove_var("RUST_LOG");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agent.log");

    let destination = LogDestination::new();
    destination.open(path.to_str().unwrap()).unwrap();
    let levels = logging::init(&destination, "info", LogFormat::Text).unwrap();

    tracing::info!("visible at info");
    tracing::debug!("hidden at info");
    let content = read(&path);
    assert!(content.contains("visible at info"));
    assert!(!content.contains("hidden at info"));

    levels.set_level("warning").unwrap();
    tracing::info!("hidden at warn");
    tracing::warn!("visible at warn");
    let content = read(&path);
    assert!(!content.contains("hidden at warn"));
    assert!(content.contains("visible at warn"));

    assert!(matches!(levels.set_level("verbose"), Err(LogError::Level { .. })));

    // A second global subscriber is refused.
    assert!(matches!(
        logging::init(&destination, "info", LogFormat::Json),
        Err(LogError::Subscriber(_))
    ));

    // Lines written after an external rotation land in the new file.
    let rotated = dir.path().join("agent.log.1");
    let before = destination.generation();
    std::fs::rename(&path, &rotated).unwrap();
    assert!(wait_until(Duration::from_secs(5), || destination.generation() > before));
    tracing::warn!("after rotation");
    assert!(read(&path).contains("after rotation"));
    assert!(read(&rotated).contains("visible at warn"));
}
