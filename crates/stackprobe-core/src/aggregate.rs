//! Multi-component status aggregation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Component, ComponentStatus, OverallStatus};

/// Result of aggregating every component in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutcome {
    pub overall_status: OverallStatus,
    pub critical_issues: Vec<String>,
    /// Issues that impair functionality without counting as critical.
    pub flagged_issues: Vec<String>,
}

/// Merge component states into an overall verdict.
///
/// A component contributes one critical issue when it is `failed` or
/// `unreachable`, or when it is `partial`/`incomplete` and essential.
/// `degraded` contributes a flagged issue instead. The overall status is
/// derived from the critical count alone.
pub fn aggregate<'a, I>(components: I) -> AggregateOutcome
where
    I: IntoIterator<Item = &'a Component>,
{
    let mut critical_issues = Vec::new();
    let mut flagged_issues = Vec::new();

    for component in components {
        let status = component.status;
        if status.is_failed() || (status.is_impaired() && component.essential) {
            critical_issues.push(describe(component));
        } else if status == ComponentStatus::Degraded {
            flagged_issues.push(describe(component));
        }
    }

    let overall_status = OverallStatus::from_critical_count(critical_issues.len());
    debug!(
        %overall_status,
        critical = critical_issues.len(),
        flagged = flagged_issues.len(),
        "Aggregated component statuses"
    );

    AggregateOutcome {
        overall_status,
        critical_issues,
        flagged_issues,
    }
}

/// Issue text for a component: what state it is in and why.
pub fn describe(component: &Component) -> String {
    let summary = match component.status {
        ComponentStatus::Failed => "is not working",
        ComponentStatus::Unreachable => "is not accessible",
        ComponentStatus::Partial => "is only partially working",
        ComponentStatus::Incomplete => "is missing expected content",
        ComponentStatus::Degraded => "has native dependency issues",
        ComponentStatus::Unknown
        | ComponentStatus::Starting
        | ComponentStatus::Running
        | ComponentStatus::Healthy => "was observed",
    };

    match &component.last_signal {
        Some(signal) => format!(
            "{} ({}) {summary} [{}]: {signal}",
            component.name, component.kind, component.status
        ),
        None => format!(
            "{} ({}) {summary} [{}]",
            component.name, component.kind, component.status
        ),
    }
}
