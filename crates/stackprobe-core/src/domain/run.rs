//! The diagnostic run accumulator and its reducer.
//!
//! A `DiagnosticRun` is built by a single control loop that folds
//! [`RunUpdate`] values into it with [`DiagnosticRun::apply`]. Nothing else
//! mutates a run; once the report is rendered it is treated as immutable.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::component::{Component, ComponentStatus};
use super::probe::ProbeResult;
use super::recommendation::Recommendation;
use crate::aggregate::AggregateOutcome;
use crate::classify::LineOutcome;
use crate::error::SpawnError;
use crate::ports::ValidationOutcome;

/// Single verdict for the whole application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl OverallStatus {
    /// Fixed thresholding policy: 0 issues is healthy, 1-2 is a warning,
    /// anything above is critical.
    #[must_use]
    pub const fn from_critical_count(count: usize) -> Self {
        match count {
            0 => Self::Healthy,
            1 | 2 => Self::Warning,
            _ => Self::Critical,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Healthy => "✅",
            Self::Warning => "⚠️",
            Self::Critical => "❌",
            Self::Unknown => "❓",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page-load timings and the performance issues they raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    /// Component name to first-endpoint latency.
    pub page_load_ms: BTreeMap<String, u64>,
    pub issues: Vec<String>,
}

/// One partial update produced by a monitoring phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunUpdate {
    /// The component's process was launched.
    Spawned { component: String, pid: Option<u32> },
    /// The component's process could not be launched.
    SpawnFailed { component: String, error: SpawnError },
    /// One classified output line.
    Line { component: String, outcome: LineOutcome },
    /// The component's port accepted a connection.
    Ready { component: String, port: u16 },
    /// The component's port never accepted a connection.
    NotReady {
        component: String,
        port: u16,
        waited_ms: u64,
    },
    /// Endpoint probes finished for the component.
    Probed {
        component: String,
        status: ComponentStatus,
        results: Vec<ProbeResult>,
        warnings: Vec<String>,
    },
    /// A user-flow check against the component finished.
    FlowChecked {
        component: String,
        flow: String,
        result: ProbeResult,
    },
    /// Page-load timing for the component.
    Performance {
        component: String,
        load_time_ms: u64,
        issue: Option<String>,
    },
    /// The component's process exited on its own before teardown.
    Exited { component: String, code: Option<i32> },
    /// The run deadline passed while the component was still pending.
    DeadlineExpired { component: String },
    /// The run deadline passed while `phase` was still working on the
    /// component.
    PhaseExpired {
        component: String,
        phase: &'static str,
    },
    /// The external config validator finished.
    ConfigValidated(ValidationOutcome),
    /// Aggregation result for the whole run.
    Aggregated(AggregateOutcome),
    /// Ranked recommendations for the whole run.
    Recommended(Vec<Recommendation>),
    /// The orchestrator failed; the run is finalized as aborted.
    Aborted(String),
}

/// The complete result of one monitoring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRun {
    pub timestamp: DateTime<Utc>,
    pub components: BTreeMap<String, Component>,
    pub overall_status: OverallStatus,
    pub critical_issues: Vec<String>,
    /// Non-critical issues (degraded components).
    pub flagged_issues: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub probes: Vec<ProbeResult>,
    pub performance: PerformanceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_validation: Option<ValidationOutcome>,
    /// Orchestrator failure reason, if the run was aborted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    #[serde(skip)]
    next_seq: u64,
}

impl DiagnosticRun {
    /// Start a run over `components`, each reset to `unknown`.
    pub fn new(timestamp: DateTime<Utc>, components: impl IntoIterator<Item = Component>) -> Self {
        let components = components
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();
        Self {
            timestamp,
            components,
            overall_status: OverallStatus::Unknown,
            critical_issues: Vec::new(),
            flagged_issues: Vec::new(),
            recommendations: Vec::new(),
            probes: Vec::new(),
            performance: PerformanceSummary::default(),
            config_validation: None,
            aborted: None,
            next_seq: 0,
        }
    }

    /// Look up a component by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// Process exit code for this run: 1 if critical or aborted, else 0.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.aborted.is_some() || matches!(self.overall_status, OverallStatus::Critical) {
            1
        } else {
            0
        }
    }

    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Fold one update into the run.
    pub fn apply(&mut self, update: RunUpdate) {
        match update {
            RunUpdate::Spawned { component, pid } => {
                let seq = self.seq();
                let signal = pid.map_or_else(
                    || "process started".to_string(),
                    |pid| format!("process started (pid {pid})"),
                );
                self.with_component(&component, |c| {
                    c.transition(ComponentStatus::Starting, signal, seq);
                });
            }
            RunUpdate::SpawnFailed { component, error } => {
                let seq = self.seq();
                self.with_component(&component, |c| {
                    let message = error.to_string();
                    c.errors.push(message.clone());
                    c.transition(ComponentStatus::Failed, message, seq);
                });
            }
            RunUpdate::Line { component, outcome } => {
                let seq = self.seq();
                self.with_component(&component, |c| {
                    if outcome.error {
                        c.errors.push(outcome.line.clone());
                    }
                    if outcome.warning {
                        c.warnings.push(outcome.line.clone());
                    }
                    // A running marker never downgrades a probe-confirmed healthy
                    // state, and output never revives a failed component.
                    let superseded = (outcome.transition == Some(ComponentStatus::Running)
                        && c.status == ComponentStatus::Healthy)
                        || c.status == ComponentStatus::Failed;
                    if let Some(status) = outcome.transition.filter(|_| !superseded) {
                        c.transition(status, outcome.line, seq);
                    }
                });
            }
            RunUpdate::Ready { component, port } => {
                let seq = self.seq();
                self.with_component(&component, |c| {
                    if c.status.is_pending() {
                        c.transition(
                            ComponentStatus::Running,
                            format!("Port {port} accepting connections"),
                            seq,
                        );
                    }
                });
            }
            RunUpdate::NotReady {
                component,
                port,
                waited_ms,
            } => {
                let seq = self.seq();
                self.with_component(&component, |c| {
                    let message =
                        format!("Port {port} did not accept connections within {waited_ms}ms");
                    c.errors.push(message.clone());
                    c.transition(ComponentStatus::Unreachable, message, seq);
                });
            }
            RunUpdate::Probed {
                component,
                status,
                results,
                warnings,
            } => {
                let seq = self.seq();
                let passed = results.iter().filter(|r| r.success).count();
                let total = results.len();
                self.with_component(&component, |c| {
                    for failed in results.iter().filter(|r| !r.success) {
                        c.errors.push(failed.describe());
                    }
                    c.warnings.extend(warnings.iter().cloned());
                    let signal = warnings.last().map_or_else(
                        || format!("{passed}/{total} endpoints responded"),
                        |w| format!("{passed}/{total} endpoints responded; {w}"),
                    );
                    c.transition(status, signal, seq);
                });
                self.probes.extend(results);
            }
            RunUpdate::FlowChecked {
                component,
                flow,
                result,
            } => {
                if !result.success {
                    let message = match (result.status_code, &result.error) {
                        (Some(code), None) => format!("{flow} returned {code}"),
                        (_, Some(err)) => format!("{flow}: {err}"),
                        (None, None) => format!("{flow}: no response"),
                    };
                    self.with_component(&component, |c| c.errors.push(message));
                }
                self.probes.push(result);
            }
            RunUpdate::Performance {
                component,
                load_time_ms,
                issue,
            } => {
                if let Some(issue) = &issue {
                    self.with_component(&component, |c| c.warnings.push(issue.clone()));
                    self.performance.issues.push(issue.clone());
                }
                self.performance
                    .page_load_ms
                    .insert(component, load_time_ms);
            }
            RunUpdate::Exited { component, code } => {
                let message = code.map_or_else(
                    || "Process was killed by a signal".to_string(),
                    |code| format!("Process exited with code {code}"),
                );
                let seq = self.seq();
                self.with_component(&component, |c| {
                    // Readiness and the exit watcher may both report the same exit.
                    if !c.errors.contains(&message) {
                        c.errors.push(message.clone());
                        c.transition(ComponentStatus::Failed, message, seq);
                    }
                });
            }
            RunUpdate::PhaseExpired { component, phase } => {
                let seq = self.seq();
                self.with_component(&component, |c| {
                    if !c.status.is_failed() {
                        let message = format!("Run deadline expired during {phase}");
                        c.errors.push(message.clone());
                        c.transition(ComponentStatus::Unreachable, message, seq);
                    }
                });
            }
            RunUpdate::DeadlineExpired { component } => {
                let seq = self.seq();
                self.with_component(&component, |c| {
                    if c.status.is_pending() {
                        let message = "Run deadline expired before the component settled";
                        c.errors.push(message.to_string());
                        c.transition(ComponentStatus::Unreachable, message, seq);
                    }
                });
            }
            RunUpdate::ConfigValidated(outcome) => {
                self.config_validation = Some(outcome);
            }
            RunUpdate::Aggregated(outcome) => {
                debug!(
                    overall = %outcome.overall_status,
                    critical = outcome.critical_issues.len(),
                    "Aggregated run"
                );
                self.overall_status = outcome.overall_status;
                self.critical_issues = outcome.critical_issues;
                self.flagged_issues = outcome.flagged_issues;
            }
            RunUpdate::Recommended(recommendations) => {
                self.recommendations = recommendations;
            }
            RunUpdate::Aborted(reason) => {
                self.critical_issues
                    .push(format!("Diagnostics failure: {reason}"));
                self.overall_status = OverallStatus::from_critical_count(self.critical_issues.len());
                self.aborted = Some(reason);
            }
        }
    }

    fn with_component(&mut self, name: &str, f: impl FnOnce(&mut Component)) {
        match self.components.get_mut(name) {
            Some(component) => f(component),
            None => warn!(component = %name, "Update for unknown component ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ComponentKind;

    fn run() -> DiagnosticRun {
        DiagnosticRun::new(
            DateTime::<Utc>::UNIX_EPOCH,
            vec![
                Component::new("frontend", ComponentKind::Frontend).essential(true),
                Component::new("backend", ComponentKind::Backend),
            ],
        )
    }

    #[test]
    fn overall_status_thresholds() {
        assert_eq!(OverallStatus::from_critical_count(0), OverallStatus::Healthy);
        assert_eq!(OverallStatus::from_critical_count(1), OverallStatus::Warning);
        assert_eq!(OverallStatus::from_critical_count(2), OverallStatus::Warning);
        assert_eq!(OverallStatus::from_critical_count(3), OverallStatus::Critical);
        assert_eq!(OverallStatus::from_critical_count(40), OverallStatus::Critical);
    }

    #[test]
    fn new_run_is_unknown() {
        let run = run();
        assert_eq!(run.overall_status, OverallStatus::Unknown);
        assert_eq!(run.components.len(), 2);
        assert_eq!(run.exit_code(), 0);
    }

    #[test]
    fn spawn_failure_marks_failed_without_starting() {
        let mut run = run();
        run.apply(RunUpdate::SpawnFailed {
            component: "backend".to_string(),
            error: SpawnError::NotFound("yarn".to_string()),
        });

        let backend = run.component("backend").unwrap();
        assert_eq!(backend.status, ComponentStatus::Failed);
        assert!(!backend.visited(ComponentStatus::Starting));
        assert_eq!(backend.errors, vec!["Executable not found: yarn".to_string()]);
    }

    #[test]
    fn line_updates_record_errors_and_transitions() {
        let mut run = run();
        run.apply(RunUpdate::Spawned {
            component: "backend".to_string(),
            pid: Some(42),
        });
        run.apply(RunUpdate::Line {
            component: "backend".to_string(),
            outcome: LineOutcome {
                line: "gyp ERR! better-sqlite3 build failed".to_string(),
                transition: Some(ComponentStatus::Degraded),
                error: true,
                warning: false,
            },
        });

        let backend = run.component("backend").unwrap();
        assert_eq!(backend.status, ComponentStatus::Degraded);
        assert_eq!(backend.errors.len(), 1);
        assert_eq!(backend.transitions[0].signal, "process started (pid 42)");
    }

    #[test]
    fn probed_update_records_results() {
        let mut run = run();
        run.apply(RunUpdate::Probed {
            component: "frontend".to_string(),
            status: ComponentStatus::Partial,
            results: vec![
                ProbeResult::response("http://h/a", true, 5, 200, ""),
                ProbeResult::response("http://h/b", false, 5, 404, ""),
            ],
            warnings: Vec::new(),
        });

        let frontend = run.component("frontend").unwrap();
        assert_eq!(frontend.status, ComponentStatus::Partial);
        assert_eq!(frontend.errors, vec!["http://h/b returned 404".to_string()]);
        assert_eq!(
            frontend.last_signal.as_deref(),
            Some("1/2 endpoints responded")
        );
        assert_eq!(run.probes.len(), 2);
    }

    #[test]
    fn ready_port_promotes_only_pending_components() {
        let mut run = run();
        run.apply(RunUpdate::Spawned {
            component: "frontend".to_string(),
            pid: None,
        });
        run.apply(RunUpdate::Ready {
            component: "frontend".to_string(),
            port: 3000,
        });
        assert_eq!(
            run.component("frontend").unwrap().status,
            ComponentStatus::Running
        );

        run.apply(RunUpdate::Line {
            component: "backend".to_string(),
            outcome: LineOutcome {
                line: "isolated-vm".to_string(),
                transition: Some(ComponentStatus::Degraded),
                error: true,
                warning: false,
            },
        });
        run.apply(RunUpdate::Ready {
            component: "backend".to_string(),
            port: 7007,
        });
        assert_eq!(
            run.component("backend").unwrap().status,
            ComponentStatus::Degraded
        );
    }

    #[test]
    fn late_running_marker_keeps_healthy() {
        let mut run = run();
        run.apply(RunUpdate::Probed {
            component: "frontend".to_string(),
            status: ComponentStatus::Healthy,
            results: vec![ProbeResult::response("http://h/", true, 5, 200, "")],
            warnings: Vec::new(),
        });
        run.apply(RunUpdate::Line {
            component: "frontend".to_string(),
            outcome: LineOutcome {
                line: "webpack compiled successfully".to_string(),
                transition: Some(ComponentStatus::Running),
                error: false,
                warning: false,
            },
        });

        let frontend = run.component("frontend").unwrap();
        assert_eq!(frontend.status, ComponentStatus::Healthy);
        assert_eq!(frontend.transitions.len(), 1);
    }

    #[test]
    fn deadline_only_touches_pending_components() {
        let mut run = run();
        run.apply(RunUpdate::Spawned {
            component: "frontend".to_string(),
            pid: None,
        });
        run.apply(RunUpdate::Probed {
            component: "backend".to_string(),
            status: ComponentStatus::Healthy,
            results: Vec::new(),
            warnings: Vec::new(),
        });
        run.apply(RunUpdate::DeadlineExpired {
            component: "frontend".to_string(),
        });
        run.apply(RunUpdate::DeadlineExpired {
            component: "backend".to_string(),
        });

        assert_eq!(
            run.component("frontend").unwrap().status,
            ComponentStatus::Unreachable
        );
        assert_eq!(
            run.component("backend").unwrap().status,
            ComponentStatus::Healthy
        );
    }

    #[test]
    fn phase_expiry_downgrades_components_still_being_probed() {
        let mut run = run();
        run.apply(RunUpdate::Ready {
            component: "frontend".to_string(),
            port: 3000,
        });
        run.apply(RunUpdate::SpawnFailed {
            component: "backend".to_string(),
            error: SpawnError::NotFound("yarn".to_string()),
        });
        for component in ["frontend", "backend"] {
            run.apply(RunUpdate::PhaseExpired {
                component: component.to_string(),
                phase: "endpoint probes",
            });
        }

        let frontend = run.component("frontend").unwrap();
        assert_eq!(frontend.status, ComponentStatus::Unreachable);
        assert_eq!(
            frontend.last_signal.as_deref(),
            Some("Run deadline expired during endpoint probes")
        );
        let backend = run.component("backend").unwrap();
        assert_eq!(backend.status, ComponentStatus::Failed);
        assert_eq!(backend.errors.len(), 1);
    }

    #[test]
    fn early_exit_fails_the_component_once() {
        let mut run = run();
        run.apply(RunUpdate::Spawned {
            component: "backend".to_string(),
            pid: Some(7),
        });
        for _ in 0..2 {
            run.apply(RunUpdate::Exited {
                component: "backend".to_string(),
                code: Some(1),
            });
        }
        run.apply(RunUpdate::Line {
            component: "backend".to_string(),
            outcome: LineOutcome {
                line: "Listening on :7007".to_string(),
                transition: Some(ComponentStatus::Running),
                error: false,
                warning: false,
            },
        });

        let backend = run.component("backend").unwrap();
        assert_eq!(backend.status, ComponentStatus::Failed);
        assert_eq!(backend.errors, vec!["Process exited with code 1".to_string()]);
        assert_eq!(backend.transitions.len(), 2);

        run.apply(RunUpdate::Exited {
            component: "frontend".to_string(),
            code: None,
        });
        assert_eq!(
            run.component("frontend").unwrap().last_signal.as_deref(),
            Some("Process was killed by a signal")
        );
    }

    #[test]
    fn abort_adds_critical_issue_and_fails_exit_code() {
        let mut run = run();
        run.apply(RunUpdate::Aborted("watcher panicked".to_string()));

        assert_eq!(run.aborted.as_deref(), Some("watcher panicked"));
        assert_eq!(
            run.critical_issues,
            vec!["Diagnostics failure: watcher panicked".to_string()]
        );
        assert_eq!(run.overall_status, OverallStatus::Warning);
        assert_eq!(run.exit_code(), 1);
    }

    #[test]
    fn updates_for_unknown_components_are_ignored() {
        let mut run = run();
        let before = run.clone();
        run.apply(RunUpdate::DeadlineExpired {
            component: "nope".to_string(),
        });
        assert_eq!(run.components, before.components);
    }
}
