//! Built-in pattern tables per component kind.

use super::pattern::{PatternSpec, PatternTable, Severity};
use crate::domain::{ComponentKind, ComponentStatus};

/// Frontend dev-server success marker.
pub const FRONTEND_READY_MARKER: &str = "webpack compiled successfully";

/// Native modules whose build failures leave the backend degraded.
pub const NATIVE_DEPENDENCY_MARKERS: [&str; 2] = ["isolated-vm", "better-sqlite3"];

/// Default rules for a component kind.
pub fn default_specs(kind: ComponentKind) -> Vec<PatternSpec> {
    let mut specs = match kind {
        ComponentKind::Frontend => vec![
            PatternSpec::contains(FRONTEND_READY_MARKER).to_status(ComponentStatus::Running),
            PatternSpec::contains("Failed to compile").severity(Severity::Error),
        ],
        ComponentKind::Backend => {
            let mut specs = vec![
                PatternSpec::contains("Listening on").to_status(ComponentStatus::Running),
                PatternSpec::contains("Backend is listening").to_status(ComponentStatus::Running),
            ];
            specs.extend(NATIVE_DEPENDENCY_MARKERS.iter().map(|marker| {
                PatternSpec::contains(*marker)
                    .to_status(ComponentStatus::Degraded)
                    .severity(Severity::Error)
            }));
            specs
        }
        ComponentKind::Api
        | ComponentKind::Catalog
        | ComponentKind::Templates
        | ComponentKind::Plugins => Vec::new(),
    };

    specs.push(PatternSpec::contains("ERROR").severity(Severity::Error));
    specs.push(PatternSpec::contains("WARNING").severity(Severity::Warning));
    if kind == ComponentKind::Frontend {
        specs.push(PatternSpec::contains("DeprecationWarning").severity(Severity::Warning));
    }
    specs
}

/// Compiled default table for a component kind.
pub fn default_table(kind: ComponentKind) -> PatternTable {
    // Built-in specs are all substring rules, so compilation cannot fail.
    PatternTable::from_specs(kind.label(), &default_specs(kind)).unwrap_or_default()
}
