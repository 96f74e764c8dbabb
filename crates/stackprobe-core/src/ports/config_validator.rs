//! Config validator port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Pass/fail result of an external configuration check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    #[must_use]
    pub const fn passed() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
        }
    }

    pub const fn failed(errors: Vec<String>) -> Self {
        Self {
            passed: false,
            errors,
        }
    }
}

/// Validates the monitored application's configuration.
///
/// Implementations report problems through the outcome rather than an
/// error: a validator that cannot run at all should return a failed outcome
/// describing why.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigValidator: Send + Sync {
    async fn validate(&self) -> ValidationOutcome;
}

/// Validator used when no external check is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

#[async_trait]
impl ConfigValidator for NoopValidator {
    async fn validate(&self) -> ValidationOutcome {
        ValidationOutcome::passed()
    }
}
