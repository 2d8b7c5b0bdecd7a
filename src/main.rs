//! carbon-agent
//!
//! ```text
//!   SIGHUP  ──▶ reopen log file ──▶ reload configuration
//!   SIGUSR2 ──▶ stop diagnostics ──▶ graceful stop
//!   rename/remove of the log file ──▶ reopen log file
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use carbon_agent::config::{render_config, AgentConfig};
use carbon_agent::lifecycle::startup::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "carbon-agent")]
#[command(about = "Carbon metrics agent", version, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the default configuration and exit
    #[arg(long)]
    config_print_default: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,

    /// Run in the background
    #[arg(short, long)]
    daemon: bool,

    /// Pid file written in daemon mode
    #[arg(long)]
    pidfile: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.config_print_default {
        return match render_config(&AgentConfig::default()) {
            Ok(rendered) => {
                println!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let options = StartupOptions {
        config_path: cli.config,
        check_config: cli.check_config,
        daemon: cli.daemon,
        pidfile: cli.pidfile,
    };

    match startup::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if tracing::dispatcher::has_been_set() {
                tracing::error!(error = %e, "Fatal error");
            } else {
                eprintln!("carbon-agent: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
