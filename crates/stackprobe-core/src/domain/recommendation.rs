//! Remediation recommendations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Recommendation priority. Orders `High < Medium < Low` so an ascending
/// sort puts the most urgent items first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Every tier, most urgent first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Heading used for the tier in the rendered report.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::High => "🔴 HIGH PRIORITY",
            Self::Medium => "🟡 MEDIUM PRIORITY",
            Self::Low => "🟢 LOW PRIORITY",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Medium => f.write_str("medium"),
            Self::Low => f.write_str("low"),
        }
    }
}

/// A ranked, human-readable remediation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub issue: String,
    pub solution: String,
}

impl Recommendation {
    pub fn new(
        priority: Priority,
        category: impl Into<String>,
        issue: impl Into<String>,
        solution: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            category: category.into(),
            issue: issue.into(),
            solution: solution.into(),
        }
    }
}
