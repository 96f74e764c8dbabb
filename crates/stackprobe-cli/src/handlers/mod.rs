//! Command handlers.
//!
//! Each handler returns the process exit code on success. Failures are
//! `anyhow` errors wrapping a [`CliError`](crate::CliError) where a specific
//! exit code applies.

pub mod check_config;
pub mod default_config;
pub mod run;
