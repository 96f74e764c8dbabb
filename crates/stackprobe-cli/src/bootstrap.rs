//! Composition root: configuration loading and session wiring.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use stackprobe_core::{CoreError, MonitorConfig, validate_config};
use stackprobe_runtime::{CommandValidator, MonitoringSession};
use tracing::debug;

use crate::error::CliError;

/// Load and validate the monitor configuration.
///
/// Without a path the built-in topology is used.
pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig, CliError> {
    let config = match path {
        Some(path) => {
            if path.is_dir() {
                return Err(CliError::Arguments(format!(
                    "{} is a directory, expected a JSON file",
                    path.display()
                )));
            }
            let text = fs::read_to_string(path)
                .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
            debug!(path = %path.display(), "Loaded monitor configuration");
            MonitorConfig::from_json(&text).map_err(CoreError::from)?
        }
        None => MonitorConfig::with_defaults(),
    };
    validate_config(&config).map_err(CoreError::from)?;
    Ok(config)
}

/// Build a session for `config`, attaching the command validator if one is
/// configured.
pub fn build_session(config: MonitorConfig) -> Result<MonitoringSession, CliError> {
    let validator = config
        .validator
        .clone()
        .map(|spec| CommandValidator::new(spec, config.startup_timeout()));

    let mut session = MonitoringSession::new(config)?;
    if let Some(validator) = validator {
        session = session.with_validator(Arc::new(validator));
    }
    Ok(session)
}
