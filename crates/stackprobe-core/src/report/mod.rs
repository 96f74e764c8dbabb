//! Report generation.
//!
//! [`render`] turns a finished [`DiagnosticRun`] into a structured
//! [`Document`]. Rendering is a pure function of the run: the same run always
//! yields the same document, which makes golden-file comparison possible.
//! Persisting the document is a [`ReportWriter`](crate::ports::ReportWriter)
//! concern.

mod markdown;
mod narrative;

use serde::{Deserialize, Serialize};

use crate::domain::{DiagnosticRun, Priority, Recommendation};

/// Title of every rendered report.
pub const REPORT_TITLE: &str = "🔬 Automated Diagnostics Report";

/// A rendered report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub title: String,
    pub generated_at: String,
    pub sections: Vec<Section>,
}

/// One titled block of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: SectionBody,
}

impl Section {
    fn new(heading: impl Into<String>, body: SectionBody) -> Self {
        Self {
            heading: heading.into(),
            body,
        }
    }
}

/// Section content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SectionBody {
    /// Plain lines, rendered as-is.
    Lines { lines: Vec<String> },
    /// Bullet list.
    Bullets { items: Vec<String> },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Child sections, rendered one heading level deeper.
    Nested { sections: Vec<Section> },
}

impl SectionBody {
    fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Lines {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    fn bullets(items: Vec<String>) -> Self {
        Self::Bullets { items }
    }
}

impl Document {
    /// Find a section by heading.
    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.heading == heading)
    }
}

/// Render a run into a report document.
pub fn render(run: &DiagnosticRun) -> Document {
    let mut sections = vec![
        executive_summary(run),
        component_table(run),
        critical_issues(run),
        flagged_issues(run),
        recommendations(&run.recommendations),
        issues_found(run),
        performance(run),
        config_validation(run),
    ];
    sections.push(Section::new(
        "User Experience Impact",
        SectionBody::lines(narrative::impact(run)),
    ));
    sections.push(Section::new(
        "Action Plan",
        SectionBody::lines(narrative::action_plan(run)),
    ));
    sections.push(Section::new(
        "What This Means for You",
        SectionBody::lines(narrative::guidance(run)),
    ));

    Document {
        title: REPORT_TITLE.to_string(),
        generated_at: run.timestamp.to_rfc3339(),
        sections,
    }
}

fn executive_summary(run: &DiagnosticRun) -> Section {
    let mut lines = vec![
        format!(
            "Overall Status: {} {}",
            run.overall_status.icon(),
            run.overall_status.as_str().to_uppercase()
        ),
        format!("Critical Issues: {}", run.critical_issues.len()),
        format!("Flagged Issues: {}", run.flagged_issues.len()),
        format!("Recommendations: {}", run.recommendations.len()),
    ];
    if let Some(reason) = &run.aborted {
        lines.push(format!("Run aborted: {reason}"));
    }
    Section::new("📊 Executive Summary", SectionBody::Lines { lines })
}

fn component_table(run: &DiagnosticRun) -> Section {
    let headers = ["Component", "Kind", "Status", "Last Signal", "Errors", "Warnings"]
        .into_iter()
        .map(String::from)
        .collect();
    let rows = run
        .components
        .values()
        .map(|c| {
            vec![
                c.name.clone(),
                c.kind.label().to_string(),
                format!("{} {}", c.status.icon(), c.status),
                c.last_signal.clone().unwrap_or_else(|| "-".to_string()),
                c.errors.len().to_string(),
                c.warnings.len().to_string(),
            ]
        })
        .collect();
    Section::new(
        "🎯 Component Status Overview",
        SectionBody::Table { headers, rows },
    )
}

fn critical_issues(run: &DiagnosticRun) -> Section {
    let body = if run.critical_issues.is_empty() {
        SectionBody::lines(["✅ No critical issues detected"])
    } else {
        SectionBody::bullets(
            run.critical_issues
                .iter()
                .map(|issue| format!("❌ {issue}"))
                .collect(),
        )
    };
    Section::new("🚨 Critical Issues Found", body)
}

fn flagged_issues(run: &DiagnosticRun) -> Section {
    let body = if run.flagged_issues.is_empty() {
        SectionBody::lines(["No flagged issues"])
    } else {
        SectionBody::bullets(
            run.flagged_issues
                .iter()
                .map(|issue| format!("🔧 {issue}"))
                .collect(),
        )
    };
    Section::new("🔧 Flagged Issues", body)
}

fn recommendations(recommendations: &[Recommendation]) -> Section {
    const HEADING: &str = "🛠️ Prioritized Recommendations";

    if recommendations.is_empty() {
        return Section::new(
            HEADING,
            SectionBody::lines(["✅ No specific recommendations needed - system is working well"]),
        );
    }

    let tiers = Priority::ALL
        .into_iter()
        .filter_map(|priority| {
            let lines: Vec<String> = recommendations
                .iter()
                .filter(|r| r.priority == priority)
                .enumerate()
                .flat_map(|(i, r)| {
                    [
                        format!("{}. **{}**: {}", i + 1, r.category, r.issue),
                        format!("   Solution: {}", r.solution),
                    ]
                })
                .collect();
            (!lines.is_empty()).then(|| Section::new(priority.heading(), SectionBody::Lines { lines }))
        })
        .collect();

    Section::new(HEADING, SectionBody::Nested { sections: tiers })
}

fn issues_found(run: &DiagnosticRun) -> Section {
    let sections: Vec<Section> = run
        .components
        .values()
        .filter(|c| !c.errors.is_empty() || !c.warnings.is_empty())
        .map(|c| {
            let mut items: Vec<String> = c.errors.iter().map(|e| format!("ERROR: {e}")).collect();
            items.extend(c.warnings.iter().map(|w| format!("WARNING: {w}")));
            Section::new(c.name.to_uppercase(), SectionBody::bullets(items))
        })
        .collect();

    let body = if sections.is_empty() {
        SectionBody::lines(["No errors or warnings recorded"])
    } else {
        SectionBody::Nested { sections }
    };
    Section::new("🐛 Issues Found", body)
}

fn performance(run: &DiagnosticRun) -> Section {
    let mut lines: Vec<String> = run
        .performance
        .page_load_ms
        .iter()
        .map(|(name, ms)| format!("Page Load Time ({name}): {ms}ms"))
        .collect();
    if !run.performance.issues.is_empty() {
        lines.push("Performance Issues:".to_string());
        lines.extend(run.performance.issues.iter().map(|i| format!("  - {i}")));
    }
    if lines.is_empty() {
        lines.push("No performance data available".to_string());
    }
    Section::new("📈 Performance Metrics", SectionBody::Lines { lines })
}

fn config_validation(run: &DiagnosticRun) -> Section {
    const HEADING: &str = "📋 Configuration Validation";

    let Some(outcome) = &run.config_validation else {
        return Section::new(HEADING, SectionBody::lines(["Not run"]));
    };
    if outcome.passed {
        return Section::new(HEADING, SectionBody::lines(["✅ Passed"]));
    }

    let mut items = vec![format!("❌ Failed ({} errors)", outcome.errors.len())];
    items.extend(outcome.errors.iter().cloned());
    Section::new(HEADING, SectionBody::bullets(items))
}
