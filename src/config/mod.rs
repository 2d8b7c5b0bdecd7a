//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (read & deserialize, defaults for missing fields)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!     → shared via Arc to the agent and startup sequence
//!
//! On SIGHUP:
//!     agent re-runs loader.rs + validation.rs
//!     → atomic swap of Arc<AgentConfig>
//!     → new log level applied
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a full reload
//! - All fields have defaults so an empty or missing file is valid
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, render_config, ConfigError};
pub use schema::AgentConfig;
pub use schema::CommonConfig;
pub use schema::DiagnosticsConfig;
pub use schema::LogFormat;
