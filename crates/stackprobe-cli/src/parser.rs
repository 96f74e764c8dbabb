//! Argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default directory for written reports.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Start a local stack, watch it come up, and report on its health.
#[derive(Debug, Parser)]
#[command(name = "stackprobe")]
#[command(about = "Health monitoring and diagnostics for a local multi-process stack")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Launch every component, probe it, and write a diagnostics report
    Run {
        /// Monitor configuration file (JSON); built-in defaults when omitted
        #[arg(short, long, env = "STACKPROBE_CONFIG")]
        config: Option<PathBuf>,

        /// Directory for diagnostics-report.md and diagnostics-results.json
        #[arg(short, long, env = "STACKPROBE_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Print the report without writing files
        #[arg(long)]
        no_write: bool,
    },

    /// Validate a monitor configuration and list its components
    CheckConfig {
        /// Monitor configuration file (JSON); built-in defaults when omitted
        #[arg(short, long, env = "STACKPROBE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the built-in configuration as JSON
    DefaultConfig,
}
