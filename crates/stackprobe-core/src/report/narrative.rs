//! Prose sections derived from component states.

use crate::domain::{ComponentKind, ComponentStatus, DiagnosticRun, OverallStatus};

fn any_of(run: &DiagnosticRun, kind: ComponentKind, pred: impl Fn(ComponentStatus) -> bool) -> bool {
    run.components
        .values()
        .any(|c| c.kind == kind && pred(c.status))
}

pub(super) fn impact(run: &DiagnosticRun) -> Vec<String> {
    let mut impacts = Vec::new();

    if any_of(run, ComponentKind::Frontend, ComponentStatus::is_ok) {
        impacts.push("✅ You can browse the catalog and navigate the UI".to_string());
    }
    if any_of(run, ComponentKind::Frontend, ComponentStatus::is_failed) {
        impacts.push("❌ The UI is not reachable".to_string());
    }
    if any_of(run, ComponentKind::Catalog, ComponentStatus::is_ok) {
        impacts.push("✅ Your personal infrastructure data is visible".to_string());
    }
    if any_of(run, ComponentKind::Backend, |s| s == ComponentStatus::Degraded) {
        impacts.push("⚠️ Template creation and scaffolding may not work".to_string());
    }
    if any_of(run, ComponentKind::Api, ComponentStatus::is_failed) {
        impacts.push("❌ Limited functionality - only static content available".to_string());
    }
    if any_of(run, ComponentKind::Templates, ComponentStatus::is_ok) {
        impacts.push("✅ Templates are available for creating new components".to_string());
    }

    if impacts.is_empty() {
        impacts.push("Impact assessment unavailable".to_string());
    }
    impacts
}

pub(super) fn action_plan(run: &DiagnosticRun) -> Vec<String> {
    let steps: [&str; 4] = if run.aborted.is_some() {
        [
            "🚨 DIAGNOSTICS DID NOT COMPLETE",
            "1. Check the diagnostics log for the failure reason",
            "2. Verify the monitor configuration",
            "3. Re-run diagnostics",
        ]
    } else {
        match run.overall_status {
            OverallStatus::Critical => [
                "🚨 IMMEDIATE ACTION REQUIRED",
                "1. Address all HIGH PRIORITY recommendations first",
                "2. Restart application components as needed",
                "3. Re-run diagnostics to verify fixes",
            ],
            OverallStatus::Warning => [
                "⚠️ ATTENTION RECOMMENDED",
                "1. Review and address HIGH PRIORITY items",
                "2. Consider addressing MEDIUM PRIORITY items",
                "3. Monitor for any new issues",
            ],
            OverallStatus::Healthy => [
                "✅ SYSTEM IS HEALTHY",
                "1. Continue normal usage",
                "2. Run periodic diagnostics",
                "3. Address any MEDIUM/LOW priority items when convenient",
            ],
            OverallStatus::Unknown => [
                "❓ STATUS UNKNOWN",
                "1. Check that every component was configured",
                "2. Increase the startup timeout",
                "3. Re-run diagnostics",
            ],
        }
    };
    steps.iter().map(ToString::to_string).collect()
}

pub(super) fn guidance(run: &DiagnosticRun) -> Vec<String> {
    let mut guidance = Vec::new();

    if any_of(run, ComponentKind::Frontend, ComponentStatus::is_ok) {
        guidance.push(
            "🎯 Your frontend is working - you can use it to browse your infrastructure".to_string(),
        );
    }
    if run
        .components
        .values()
        .any(|c| c.kind != ComponentKind::Frontend && c.status == ComponentStatus::Degraded)
    {
        guidance.push(
            "💡 While some backend features are limited, you can still use the catalog and basic functionality"
                .to_string(),
        );
    }
    if !run.recommendations.is_empty() {
        guidance.push("🔧 Follow the recommendations above to improve functionality".to_string());
    }
    guidance.push("📊 Re-run this diagnostic anytime with: `stackprobe run`".to_string());
    guidance
}
