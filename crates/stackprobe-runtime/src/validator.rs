//! Command-based configuration validator.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{empty, select};
use stackprobe_core::{ConfigValidator, ProcessSpec, ValidationOutcome};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::process::{LineStream, ProcessSupervisor};

const VALIDATOR_NAME: &str = "config-validator";

/// Runs an external command and reports its verdict.
///
/// The check passes when the command exits 0. Output lines starting with
/// `❌` or `ERROR` become the error list.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    spec: ProcessSpec,
    limit: Duration,
}

impl CommandValidator {
    pub const fn new(spec: ProcessSpec, limit: Duration) -> Self {
        Self { spec, limit }
    }

    async fn run(&self, supervisor: &mut ProcessSupervisor) -> ValidationOutcome {
        let mut handle = match supervisor.start(VALIDATOR_NAME, &self.spec).await {
            Ok(handle) => handle,
            Err(e) => return ValidationOutcome::failed(vec![e.to_string()]),
        };

        // Read both pipes together so neither can fill up and block the child.
        let or_empty = |s: Option<LineStream>| s.unwrap_or_else(|| Box::pin(empty()));
        let mut lines = select(or_empty(handle.take_stdout()), or_empty(handle.take_stderr()));
        let mut errors = Vec::new();
        while let Some(line) = lines.next().await {
            debug!(validator = %self.spec.display(), "{}", line);
            let trimmed = line.trim_start();
            if trimmed.starts_with('❌') || trimmed.starts_with("ERROR") {
                errors.push(trimmed.to_string());
            }
        }

        match supervisor.wait(VALIDATOR_NAME).await {
            Ok(Some(0)) if errors.is_empty() => ValidationOutcome::passed(),
            Ok(Some(0)) => {
                warn!("Validator exited 0 but reported errors");
                ValidationOutcome::failed(errors)
            }
            Ok(code) => {
                if errors.is_empty() {
                    errors.push(match code {
                        Some(code) => format!("Validator exited with code {code}"),
                        None => "Validator was killed by a signal".to_string(),
                    });
                }
                ValidationOutcome::failed(errors)
            }
            Err(e) => ValidationOutcome::failed(vec![e.to_string()]),
        }
    }
}

#[async_trait]
impl ConfigValidator for CommandValidator {
    async fn validate(&self) -> ValidationOutcome {
        let mut supervisor = ProcessSupervisor::new();
        let outcome = timeout(self.limit, self.run(&mut supervisor)).await;
        supervisor.terminate_all().await;

        outcome.unwrap_or_else(|_| {
            ValidationOutcome::failed(vec![format!(
                "Validator did not finish within {}ms",
                self.limit.as_millis()
            )])
        })
    }
}
