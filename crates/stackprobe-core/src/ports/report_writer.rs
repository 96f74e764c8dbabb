//! Report writer port.

use std::path::PathBuf;

use crate::domain::DiagnosticRun;
use crate::error::CoreError;
use crate::report::Document;

/// Where a report was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

/// Persists a rendered report and its machine-readable run.
pub trait ReportWriter: Send + Sync {
    fn write(&self, document: &Document, run: &DiagnosticRun) -> Result<WrittenReport, CoreError>;
}
