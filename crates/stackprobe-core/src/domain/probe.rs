//! Probe results.

use serde::{Deserialize, Serialize};

/// Maximum number of characters kept from a response body.
pub const BODY_SAMPLE_LIMIT: usize = 256;

/// Outcome of a single endpoint probe. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// URL that was requested.
    pub target: String,
    pub success: bool,
    pub latency_ms: u64,
    /// Absent when no response was received (timeout, refused connection).
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_sample: Option<String>,
    /// Recorded probe error, if the probe failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    /// A probe that received a response.
    pub fn response(
        target: impl Into<String>,
        success: bool,
        latency_ms: u64,
        status_code: u16,
        body: &str,
    ) -> Self {
        Self {
            target: target.into(),
            success,
            latency_ms,
            status_code: Some(status_code),
            body_sample: sample(body),
            error: None,
        }
    }

    /// A probe that failed before or while receiving a response.
    pub fn failure(target: impl Into<String>, latency_ms: u64, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            success: false,
            latency_ms,
            status_code: None,
            body_sample: None,
            error: Some(error.into()),
        }
    }

    /// Attach a failure reason to a probe that did get a response.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    /// Short description used as a transition signal or error line.
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.error, self.status_code) {
            (Some(err), _) => format!("{}: {}", self.target, err),
            (None, Some(code)) => format!("{} returned {}", self.target, code),
            (None, None) => format!("{}: no response", self.target),
        }
    }
}

fn sample(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    Some(body.chars().take(BODY_SAMPLE_LIMIT).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_truncates_body_sample() {
        let body = "x".repeat(1000);
        let result = ProbeResult::response("http://localhost:7007/api", true, 12, 200, &body);
        assert_eq!(result.body_sample.unwrap().len(), BODY_SAMPLE_LIMIT);
        assert_eq!(result.status_code, Some(200));
    }

    #[test]
    fn failure_has_no_status_code() {
        let result = ProbeResult::failure("http://localhost:3000/", 10_000, "Request timeout");
        assert!(!result.success);
        assert_eq!(result.status_code, None);
        assert_eq!(result.describe(), "http://localhost:3000/: Request timeout");
    }

    #[test]
    fn with_error_marks_failure() {
        let result = ProbeResult::response("u", true, 1, 200, "[]").with_error("empty array");
        assert!(!result.success);
        assert_eq!(result.status_code, Some(200));
    }
}
