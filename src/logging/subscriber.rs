//! Global tracing subscriber wired to the log destination.
//!
//! # Responsibilities
//! - Install the process-wide subscriber once, at startup
//! - Route every event through the [`LogDestination`]
//! - Change the level filter at runtime (configuration reload)
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level at startup
//! - ANSI colours are off: output usually lands in a file
//! - Level names accept the common aliases `warning`, `fatal` and `panic`

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LogFormat;
use crate::logging::{LogDestination, LogError};

/// Handle for changing the active level after initialisation.
#[derive(Clone)]
pub struct LevelHandle {
    inner: reload::Handle<EnvFilter, Registry>,
}

impl LevelHandle {
    /// Replace the level filter with `level`.
    pub fn set_level(&self, level: &str) -> Result<(), LogError> {
        let filter = level_filter(parse_level(level)?);
        self.inner
            .reload(filter)
            .map_err(|e| LogError::Subscriber(e.to_string()))?;
        tracing::debug!(level = %level, "Log level changed");
        Ok(())
    }
}

impl std::fmt::Debug for LevelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelHandle").finish_non_exhaustive()
    }
}

/// Parse a configured level name.
pub fn parse_level(level: &str) -> Result<LevelFilter, LogError> {
    let normalized = level.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(LogError::Level {
            level: level.to_owned(),
            reason: "level must not be empty".to_owned(),
        });
    }

    let canonical = match normalized.as_str() {
        "warning" => "warn",
        "fatal" | "panic" => "error",
        other => other,
    };

    canonical
        .parse::<LevelFilter>()
        .map_err(|e| LogError::Level {
            level: level.to_owned(),
            reason: e.to_string(),
        })
}

fn level_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::default().add_directive(level.into())
}

/// Install the global subscriber writing to `destination`.
///
/// Fails if the level is invalid or a global subscriber already exists.
pub fn init(
    destination: &LogDestination,
    level: &str,
    format: LogFormat,
) -> Result<LevelHandle, LogError> {
    let level = parse_level(level)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(level));
    let (filter, handle) = reload::Layer::new(filter);

    let output = fmt::layer()
        .with_writer(destination.writer())
        .with_ansi(false);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => registry.with(output).try_init(),
        LogFormat::Json => registry.with(output.json()).try_init(),
    };
    installed.map_err(|e| LogError::Subscriber(e.to_string()))?;

    Ok(LevelHandle { inner: handle })
}
