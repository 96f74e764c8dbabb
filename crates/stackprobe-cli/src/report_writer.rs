//! Filesystem report writer.

use std::fs;
use std::path::{Path, PathBuf};

use stackprobe_core::{CoreError, DiagnosticRun, Document, ReportWriter, WrittenReport};

pub const MARKDOWN_REPORT_FILE: &str = "diagnostics-report.md";
pub const JSON_REPORT_FILE: &str = "diagnostics-results.json";

/// Writes the Markdown report and the JSON run into one directory.
#[derive(Debug, Clone)]
pub struct FsReportWriter {
    dir: PathBuf,
}

impl FsReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CoreError> {
    fs::write(path, contents)
        .map_err(|e| CoreError::External(format!("Failed to write {}: {e}", path.display())))
}

impl ReportWriter for FsReportWriter {
    fn write(&self, document: &Document, run: &DiagnosticRun) -> Result<WrittenReport, CoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CoreError::External(format!("Failed to create {}: {e}", self.dir.display()))
        })?;

        let json = serde_json::to_string_pretty(run)
            .map_err(|e| CoreError::External(format!("Failed to serialize run: {e}")))?;

        let written = WrittenReport {
            markdown: self.dir.join(MARKDOWN_REPORT_FILE),
            json: self.dir.join(JSON_REPORT_FILE),
        };
        write_file(&written.markdown, &document.to_markdown())?;
        write_file(&written.json, &json)?;
        Ok(written)
    }
}
