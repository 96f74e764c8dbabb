//! Command-line adapter for stackprobe.
//!
//! `main.rs` parses arguments and initialises logging; everything it
//! dispatches to lives here so it can be tested without a process boundary.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by main.rs only.
use dotenvy as _;
use tokio as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod report_writer;

pub use bootstrap::{build_session, load_config};
pub use error::CliError;
pub use parser::{Cli, Commands};
pub use report_writer::{FsReportWriter, JSON_REPORT_FILE, MARKDOWN_REPORT_FILE};
