//! HTTP endpoint probing.
//!
//! Every probe is a single GET bounded by a timeout. Failures of any kind are
//! recorded in the returned [`ProbeResult`]; nothing here returns an error to
//! the caller.

use std::time::Duration;

use futures_util::future::join_all;
use reqwest::Client;
use reqwest::header::ACCEPT;
use stackprobe_core::{BodyPredicate, ComponentSpec, ComponentStatus, ProbeError, ProbeResult};
use tokio::time::{Instant, timeout};
use tracing::debug;

/// User agent sent with every probe.
pub const USER_AGENT: &str = concat!("stackprobe/", env!("CARGO_PKG_VERSION"));

/// Page loads at or above this are reported as slow.
pub const SLOW_PAGE_MS: u64 = 2_000;

/// Page loads at or above this are reported as very slow.
pub const VERY_SLOW_PAGE_MS: u64 = 5_000;

/// Per-probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub expect: Option<BodyPredicate>,
}

impl ProbeOptions {
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            expect: None,
        }
    }

    #[must_use]
    pub fn expect(mut self, predicate: Option<BodyPredicate>) -> Self {
        self.expect = predicate;
        self
    }
}

/// Outcome of probing every endpoint of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentProbe {
    pub status: ComponentStatus,
    pub results: Vec<ProbeResult>,
    pub warnings: Vec<String>,
}

/// Component status implied by its endpoint results.
///
/// All succeeded → `healthy`; some → `partial`; none, or no endpoints at
/// all → `failed`.
pub fn endpoint_status(results: &[ProbeResult]) -> ComponentStatus {
    let passed = results.iter().filter(|r| r.success).count();
    match passed {
        0 => ComponentStatus::Failed,
        n if n == results.len() => ComponentStatus::Healthy,
        _ => ComponentStatus::Partial,
    }
}

/// Performance issue for a page load, if it was slow.
pub fn performance_issue(load_time_ms: u64) -> Option<String> {
    if load_time_ms >= VERY_SLOW_PAGE_MS {
        Some(format!("Very slow page load: {load_time_ms}ms"))
    } else if load_time_ms >= SLOW_PAGE_MS {
        Some(format!("Slow page load: {load_time_ms}ms"))
    } else {
        None
    }
}

/// Issues HTTP probes with a shared client.
#[derive(Debug, Clone)]
pub struct ProbeRunner {
    client: Client,
}

impl ProbeRunner {
    pub fn new() -> Result<Self, ProbeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(|e| ProbeError::Connect(e.to_string()))?;
        Ok(Self { client })
    }

    /// Probe one URL.
    ///
    /// Success means status 200 and, when configured, a body satisfying the
    /// predicate. A timeout yields no status code.
    pub async fn probe(&self, url: &str, options: &ProbeOptions) -> ProbeResult {
        let started = Instant::now();
        let fetched = self.fetch(url, options.timeout).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match fetched {
            Ok((200, body)) => {
                let result = ProbeResult::response(url, true, latency_ms, 200, &body);
                match options.expect.as_ref().map(|p| p.check(&body)) {
                    Some(Err(reason)) => result.with_error(ProbeError::Predicate(reason).to_string()),
                    _ => result,
                }
            }
            Ok((code, body)) => ProbeResult::response(url, false, latency_ms, code, &body),
            Err(e) => ProbeResult::failure(url, latency_ms, e.to_string()),
        };

        debug!(
            url = %url,
            success = result.success,
            status = ?result.status_code,
            latency_ms,
            "Probe finished"
        );
        result
    }

    async fn fetch(&self, url: &str, limit: Duration) -> Result<(u16, String), ProbeError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| {
                    if e.is_builder() {
                        ProbeError::InvalidUrl(url.to_string())
                    } else {
                        ProbeError::Connect(e.to_string())
                    }
                })?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| ProbeError::Body(e.to_string()))?;
            Ok((status, body))
        };

        timeout(limit, request)
            .await
            .unwrap_or(Err(ProbeError::Timeout(limit)))
    }

    /// Probe every endpoint of `spec` concurrently, then its content check.
    pub async fn probe_component(&self, spec: &ComponentSpec, limit: Duration) -> ComponentProbe {
        let results = join_all(spec.endpoints.iter().map(|endpoint| {
            let options = ProbeOptions::new(limit).expect(endpoint.expect.clone());
            async move { self.probe(&endpoint.url, &options).await }
        }))
        .await;

        let mut status = endpoint_status(&results);
        let mut warnings = Vec::new();

        if status == ComponentStatus::Healthy
            && let Some(check) = &spec.content_check
        {
            let options = ProbeOptions::new(limit).expect(Some(check.predicate.clone()));
            let result = self.probe(&check.url, &options).await;
            if !result.success {
                let reason = check
                    .message
                    .clone()
                    .or_else(|| result.error.clone())
                    .unwrap_or_else(|| result.describe());
                warnings.push(format!("Content check failed: {reason}"));
                status = ComponentStatus::Incomplete;
            }
        }

        ComponentProbe {
            status,
            results,
            warnings,
        }
    }

    /// Check every user flow of `spec`, in order.
    pub async fn check_flows(&self, spec: &ComponentSpec, limit: Duration) -> Vec<(String, ProbeResult)> {
        let options = ProbeOptions::new(limit);
        let mut checked = Vec::with_capacity(spec.user_flows.len());
        for flow in &spec.user_flows {
            let result = self.probe(&flow.url, &options).await;
            checked.push((flow.name.clone(), result));
        }
        checked
    }
}
