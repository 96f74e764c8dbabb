//! Pure domain for stackprobe: component state, output classification,
//! aggregation, recommendations, report rendering and monitor configuration.
//!
//! Nothing in this crate spawns processes or touches the network. The
//! runtime crate feeds observations in as [`RunUpdate`] values and the run
//! folds them with [`DiagnosticRun::apply`].
#![deny(unused_crate_dependencies)]

pub mod aggregate;
pub mod classify;
pub mod domain;
pub mod error;
pub mod ports;
pub mod recommend;
pub mod report;
pub mod settings;

// Re-export commonly used types for convenience
pub use aggregate::{AggregateOutcome, aggregate};
pub use classify::{
    Classification, LineBuffer, LineOutcome, OutputClassifier, PatternSpec, PatternTable,
    Severity, classify_lines, default_table,
};
pub use domain::{
    BODY_SAMPLE_LIMIT, Component, ComponentKind, ComponentStatus, DiagnosticRun, OverallStatus,
    PerformanceSummary, Priority, ProbeResult, Recommendation, RunUpdate, StatusTransition,
};
pub use error::{ConfigError, CoreError, OrchestratorError, ProbeError, SpawnError};
pub use ports::{ConfigValidator, NoopValidator, ReportWriter, ValidationOutcome, WrittenReport};
pub use recommend::{recommend, recommend_for_run};
pub use report::{Document, Section, SectionBody, render};
pub use settings::{
    BodyPredicate, ComponentSpec, ContentCheck, EndpointSpec, MonitorConfig, ProcessSpec,
    UserFlow, validate_config,
};
