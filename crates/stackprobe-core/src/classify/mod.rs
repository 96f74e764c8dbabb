//! Output classification.
//!
//! Each component's output stream drives a small state machine. The pattern
//! table is evaluated against every line in arrival order and the last
//! matching transition wins, so a later success marker can upgrade a
//! component that looked degraded and vice versa.

mod defaults;
mod line_buffer;
mod pattern;

pub use defaults::{FRONTEND_READY_MARKER, NATIVE_DEPENDENCY_MARKERS, default_specs, default_table};
pub use line_buffer::LineBuffer;
pub use pattern::{LineOutcome, Matcher, PatternRule, PatternSpec, PatternTable, Severity};

use crate::domain::ComponentStatus;

/// Final state after classifying a sequence of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: ComponentStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Line behind the last transition.
    pub last_signal: Option<String>,
}

impl Classification {
    pub const fn new(initial: ComponentStatus) -> Self {
        Self {
            status: initial,
            errors: Vec::new(),
            warnings: Vec::new(),
            last_signal: None,
        }
    }

    /// Fold one line outcome into the classification.
    pub fn record(&mut self, outcome: &LineOutcome) {
        if outcome.error {
            self.errors.push(outcome.line.clone());
        }
        if outcome.warning {
            self.warnings.push(outcome.line.clone());
        }
        if let Some(status) = outcome.transition {
            self.status = status;
            self.last_signal = Some(outcome.line.clone());
        }
    }
}

/// Stateful per-component classifier fed with raw output chunks.
#[derive(Debug, Clone)]
pub struct OutputClassifier {
    table: PatternTable,
    buffer: LineBuffer,
    state: Classification,
}

impl OutputClassifier {
    pub fn new(table: PatternTable, initial: ComponentStatus) -> Self {
        Self {
            table,
            buffer: LineBuffer::new(),
            state: Classification::new(initial),
        }
    }

    /// Classify one complete line.
    pub fn observe_line(&mut self, line: &str) -> Option<LineOutcome> {
        let outcome = self.table.classify_line(line)?;
        self.state.record(&outcome);
        Some(outcome)
    }

    /// Feed a raw chunk; returns outcomes for every line it completed.
    pub fn observe_chunk(&mut self, chunk: &[u8]) -> Vec<LineOutcome> {
        self.buffer
            .push(chunk)
            .iter()
            .filter_map(|line| self.observe_line(line))
            .collect()
    }

    pub const fn state(&self) -> &Classification {
        &self.state
    }

    /// Flush the trailing partial line and return the final state.
    pub fn finish(mut self) -> Classification {
        if let Some(rest) = self.buffer.finish() {
            self.observe_line(&rest);
        }
        self.state
    }
}

/// Classify an ordered line sequence starting from `initial`.
///
/// Pure: the same lines and initial state always give the same result.
pub fn classify_lines<I, S>(table: &PatternTable, lines: I, initial: ComponentStatus) -> Classification
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut classifier = OutputClassifier::new(table.clone(), initial);
    for line in lines {
        classifier.observe_line(line.as_ref());
    }
    classifier.finish()
}
