//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Process-wide settings (identity, logging, workers).
    pub common: CommonConfig,

    /// Diagnostics HTTP endpoint.
    pub diagnostics: DiagnosticsConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CommonConfig {
    /// User to run as (empty = current user).
    pub user: String,

    /// Log file path (empty = stderr).
    pub logfile: String,

    /// Log level (trace, debug, info, warn, error, off).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Number of runtime worker threads.
    pub max_cpu: usize,

    /// Interval between internal stats lines, in seconds.
    pub metric_interval_secs: u64,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            logfile: "/var/log/carbon-agent/carbon-agent.log".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            max_cpu: 1,
            metric_interval_secs: 60,
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Diagnostics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Enable the diagnostics endpoint.
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:7007").
    pub listen: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "127.0.0.1:7007".to_string(),
        }
    }
}
