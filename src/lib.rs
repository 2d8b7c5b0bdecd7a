//! carbon-agent daemon library.
//!
//! Process lifecycle and logging core: a reopenable log destination that
//! follows external rotation, signal-driven reload and shutdown, and the
//! startup sequence that ties them to the agent.

pub mod agent;
pub mod config;
pub mod diagnostics;
pub mod lifecycle;
pub mod logging;
pub mod process;

pub use agent::Agent;
pub use config::AgentConfig;
pub use lifecycle::{Lifecycle, LifecycleState, Orchestrator, Shutdown};
pub use logging::LogDestination;
