//! Recommendation synthesis.
//!
//! A fixed lookup table maps `(component kind, status)` to at most one
//! remediation step. Output is ranked by priority, then by the order in
//! which each component's current status was first detected.

use crate::domain::{Component, ComponentKind, ComponentStatus, DiagnosticRun, Priority, Recommendation};

use ComponentStatus::{Degraded, Failed, Incomplete, Partial, Starting, Unknown, Unreachable};

struct Rule {
    /// `None` matches any kind.
    kind: Option<ComponentKind>,
    statuses: &'static [ComponentStatus],
    priority: Priority,
    issue: &'static str,
    solution: &'static str,
}

/// Rules are matched top to bottom; kind-specific rules come first.
const RULES: &[Rule] = &[
    Rule {
        kind: Some(ComponentKind::Frontend),
        statuses: &[Failed, Unreachable],
        priority: Priority::High,
        issue: "Frontend is not accessible",
        solution: "Run `yarn workspace app start` and check for compilation errors",
    },
    Rule {
        kind: Some(ComponentKind::Frontend),
        statuses: &[Partial, Incomplete],
        priority: Priority::Medium,
        issue: "Pages not loading properly",
        solution: "Check browser console for JavaScript errors and verify build process",
    },
    Rule {
        kind: Some(ComponentKind::Backend),
        statuses: &[Degraded],
        priority: Priority::Medium,
        issue: "Native dependencies failed to build",
        solution: "Install build tools: `npm install -g node-gyp` and Xcode command line tools",
    },
    Rule {
        kind: Some(ComponentKind::Backend),
        statuses: &[Failed, Unreachable],
        priority: Priority::High,
        issue: "Backend is not running",
        solution: "Start backend with `yarn workspace backend start` and inspect its error output",
    },
    Rule {
        kind: Some(ComponentKind::Api),
        statuses: &[Failed, Unreachable],
        priority: Priority::High,
        issue: "Backend API is not responding",
        solution: "Start backend with `yarn workspace backend start` or use frontend-only mode",
    },
    Rule {
        kind: Some(ComponentKind::Api),
        statuses: &[Partial, Incomplete],
        priority: Priority::Medium,
        issue: "Some API endpoints are failing",
        solution: "Review the failing endpoints listed under component errors and their plugin configuration",
    },
    Rule {
        kind: Some(ComponentKind::Catalog),
        statuses: &[Failed, Unreachable, Partial, Incomplete],
        priority: Priority::High,
        issue: "Catalog has loading issues",
        solution: "Check YAML files in examples/ directory for syntax errors",
    },
    Rule {
        kind: Some(ComponentKind::Templates),
        statuses: &[Failed, Unreachable],
        priority: Priority::Medium,
        issue: "Templates are not available",
        solution: "Verify the scaffolder backend plugin is installed and the catalog API is reachable",
    },
    Rule {
        kind: Some(ComponentKind::Templates),
        statuses: &[Partial, Incomplete],
        priority: Priority::Low,
        issue: "No templates found",
        solution: "Register template entities in a catalog location",
    },
    Rule {
        kind: Some(ComponentKind::Plugins),
        statuses: &[Failed, Unreachable],
        priority: Priority::High,
        issue: "Plugin pages are not loading",
        solution: "Check that the frontend is running and plugin routes are registered in the app",
    },
    Rule {
        kind: Some(ComponentKind::Plugins),
        statuses: &[Partial, Incomplete],
        priority: Priority::Medium,
        issue: "Some plugin pages are not loading",
        solution: "Check the failing plugin routes listed under component errors",
    },
    Rule {
        kind: None,
        statuses: &[Degraded],
        priority: Priority::Medium,
        issue: "Component reported native dependency problems",
        solution: "Reinstall dependencies and rebuild native modules",
    },
    Rule {
        kind: None,
        statuses: &[Unknown, Starting],
        priority: Priority::Low,
        issue: "Component status could not be determined",
        solution: "Re-run diagnostics with a longer startup timeout",
    },
];

fn lookup(kind: ComponentKind, status: ComponentStatus) -> Option<&'static Rule> {
    RULES.iter().find(|rule| {
        rule.kind.is_none_or(|k| k == kind) && rule.statuses.contains(&status)
    })
}

/// Recommendation for one component, if its state calls for one.
pub fn recommendation_for(component: &Component) -> Option<Recommendation> {
    if component.status.is_ok() {
        return None;
    }
    lookup(component.kind, component.status).map(|rule| {
        Recommendation::new(rule.priority, component.kind.label(), rule.issue, rule.solution)
    })
}

/// Ranked recommendations for a set of components.
pub fn recommend<'a, I>(components: I) -> Vec<Recommendation>
where
    I: IntoIterator<Item = &'a Component>,
{
    let mut ranked: Vec<(u64, Recommendation)> = components
        .into_iter()
        .filter_map(|c| {
            recommendation_for(c).map(|rec| (c.detected_seq().unwrap_or(u64::MAX), rec))
        })
        .collect();

    // Stable: ties keep input order.
    ranked.sort_by_key(|(seq, rec)| (rec.priority, *seq));
    ranked.into_iter().map(|(_, rec)| rec).collect()
}

/// Ranked recommendations for a whole run, including configuration problems.
pub fn recommend_for_run(run: &DiagnosticRun) -> Vec<Recommendation> {
    let mut recommendations = recommend(run.components.values());

    if let Some(validation) = run.config_validation.as_ref().filter(|v| !v.passed) {
        let rec = Recommendation::new(
            Priority::Medium,
            "Configuration",
            format!(
                "Configuration validation failed ({} errors)",
                validation.errors.len()
            ),
            "Fix the reported configuration errors and re-run diagnostics",
        );
        // After every component recommendation of the same tier.
        let at = recommendations
            .iter()
            .position(|r| r.priority > rec.priority)
            .unwrap_or(recommendations.len());
        recommendations.insert(at, rec);
    }

    recommendations
}
