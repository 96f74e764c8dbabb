//! `stackprobe run`: one full monitoring session.

use std::path::Path;

use anyhow::Result;
use stackprobe_core::{ReportWriter, render};
use tracing::info;

use crate::bootstrap::{build_session, load_config};
use crate::error::CliError;
use crate::report_writer::FsReportWriter;

/// Run a session, print the report, and optionally write it to `output_dir`.
///
/// Returns 1 when the stack is critical or the run aborted, 0 otherwise.
pub async fn execute(config: Option<&Path>, output_dir: &Path, write: bool) -> Result<i32> {
    let config = load_config(config)?;
    info!(components = config.components.len(), "Starting diagnostics run");

    let run = build_session(config)?.run().await;
    let document = render(&run);
    println!("{}", document.to_markdown());

    if write {
        let written = FsReportWriter::new(output_dir)
            .write(&document, &run)
            .map_err(CliError::from)?;
        println!("📄 Detailed report saved to: {}", written.markdown.display());
        println!("📄 Raw results saved to: {}", written.json.display());
    }

    info!(
        overall = %run.overall_status,
        critical = run.critical_issues.len(),
        "Diagnostics run finished"
    );
    Ok(run.exit_code())
}
