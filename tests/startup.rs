//! Startup failure paths.
//!
//! `startup::run` installs the global subscriber, so each binary runs it once.

use std::path::PathBuf;

use carbon_agent::config::ConfigError;
use carbon_agent::lifecycle::startup::{self, StartupError, StartupOptions};
use carbon_agent::lifecycle::AppError;

#[test]
fn missing_configuration_file_is_fatal() {
    let options = StartupOptions {
        config_path: Some(PathBuf::from("/nonexistent/carbon-agent.toml")),
        check_config: true,
        ..Default::default()
    };

    let err = startup::run(options).unwrap_err();
    assert!(
        matches!(err, StartupError::App(AppError::Config(ConfigError::Io(_)))),
        "unexpected error: {err}"
    );
}
