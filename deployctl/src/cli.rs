//! Command-line surface.
//!
//! Parsing is where ports get validated: an out-of-range or non-numeric
//! override value is a synchronous usage error, never deferred to the
//! engine invocation.

use crate::mode::{DeployMode, PortOverride, RequestError};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "deployctl")]
#[command(about = "Deployment orchestration and environment bootstrap for the EduAgent stack")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Tear down and bring up the stack for the given mode
    Up {
        /// Deployment mode
        #[arg(value_enum)]
        mode: DeployMode,
        /// External port for the API service (applied in prod only)
        #[arg(long, value_parser = parse_port)]
        api_port: Option<PortOverride>,
        /// External port for the UI service (applied in prod only)
        #[arg(long, value_parser = parse_port)]
        ui_port: Option<PortOverride>,
        /// Print the resolved invocation as JSON instead of running it
        #[arg(long)]
        dry_run: bool,
    },
    /// Tear down the stack for the given mode
    Down {
        /// Deployment mode
        #[arg(value_enum)]
        mode: DeployMode,
    },
    /// Run the host preflight checks
    Check,
    /// Reconcile the .env file with the operator identity entries
    Env,
}

fn parse_port(s: &str) -> Result<PortOverride, RequestError> {
    s.parse()
}
