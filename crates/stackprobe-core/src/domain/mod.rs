//! Domain types for a diagnostic run.
//!
//! These are pure data types with no process or network dependencies.

mod component;
mod probe;
mod recommendation;
mod run;

pub use component::{Component, ComponentKind, ComponentStatus, StatusTransition};
pub use probe::{BODY_SAMPLE_LIMIT, ProbeResult};
pub use recommendation::{Priority, Recommendation};
pub use run::{DiagnosticRun, OverallStatus, PerformanceSummary, RunUpdate};
