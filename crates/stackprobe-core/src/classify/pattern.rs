//! Declarative pattern tables.
//!
//! A table is an ordered list of rules. Each rule pairs a matcher with an
//! optional status transition and a severity. Tables are data: they are built
//! from [`PatternSpec`] values (usually from configuration) and evaluated one
//! line at a time with no I/O involved.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::ComponentStatus;
use crate::error::ConfigError;

/// How a matching line is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Not recorded; only the transition (if any) applies.
    #[default]
    Info,
    /// Appended to the component's warnings.
    Warning,
    /// Appended to the component's errors.
    Error,
}

/// Serializable form of a rule, as written in configuration.
///
/// Exactly one of `contains` or `regex` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// State to move to when the rule matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ComponentStatus>,
    pub severity: Severity,
}

impl PatternSpec {
    /// Substring rule.
    pub fn contains(needle: impl Into<String>) -> Self {
        Self {
            contains: Some(needle.into()),
            ..Self::default()
        }
    }

    /// Regular-expression rule.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            regex: Some(pattern.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn to_status(mut self, status: ComponentStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub const fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Compile into an executable rule.
    pub fn compile(&self, component: &str) -> Result<PatternRule, ConfigError> {
        let matcher = match (&self.contains, &self.regex) {
            (Some(needle), None) => Matcher::Contains(needle.clone()),
            (None, Some(pattern)) => {
                let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                    component: component.to_string(),
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                Matcher::Regex(regex)
            }
            _ => return Err(ConfigError::AmbiguousPattern(component.to_string())),
        };

        Ok(PatternRule {
            matcher,
            transition: self.status,
            severity: self.severity,
        })
    }
}

/// Line matcher.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-sensitive substring match.
    Contains(String),
    Regex(Regex),
}

impl Matcher {
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Self::Contains(needle) => line.contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(line),
        }
    }

    /// The pattern text, for logging.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Contains(needle) => needle,
            Self::Regex(regex) => regex.as_str(),
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Contains(a), Self::Contains(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// A compiled rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRule {
    pub matcher: Matcher,
    pub transition: Option<ComponentStatus>,
    pub severity: Severity,
}

/// What a single line did to its component.
///
/// A line with no matching rule produces no outcome at all; that is the
/// "no match" case and not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    pub line: String,
    /// Last matching transition for this line.
    pub transition: Option<ComponentStatus>,
    /// Record the line in `errors`.
    pub error: bool,
    /// Record the line in `warnings`.
    pub warning: bool,
}

/// Ordered rule list evaluated against every line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternTable {
    rules: Vec<PatternRule>,
}

impl PatternTable {
    pub const fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    /// Compile a table from specs, failing on the first invalid rule.
    pub fn from_specs(component: &str, specs: &[PatternSpec]) -> Result<Self, ConfigError> {
        let rules = specs
            .iter()
            .map(|spec| spec.compile(component))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against `line`.
    ///
    /// Returns `None` when no rule matched or the matching rules neither
    /// transition nor record anything.
    pub fn classify_line(&self, line: &str) -> Option<LineOutcome> {
        let mut transition = None;
        let mut error = false;
        let mut warning = false;

        for rule in self.rules.iter().filter(|r| r.matcher.matches(line)) {
            if rule.transition.is_some() {
                transition = rule.transition;
            }
            match rule.severity {
                Severity::Error => error = true,
                Severity::Warning => warning = true,
                Severity::Info => {}
            }
        }

        if transition.is_none() && !error && !warning {
            return None;
        }

        Some(LineOutcome {
            line: line.to_string(),
            transition,
            error,
            warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PatternTable {
        PatternTable::from_specs(
            "backend",
            &[
                PatternSpec::contains("Listening on").to_status(ComponentStatus::Running),
                PatternSpec::contains("better-sqlite3")
                    .to_status(ComponentStatus::Degraded)
                    .severity(Severity::Error),
                PatternSpec::contains("ERROR").severity(Severity::Error),
                PatternSpec::regex(r"(?i)deprecat").severity(Severity::Warning),
            ],
        )
        .unwrap()
    }

    #[test]
    fn unmatched_line_has_no_outcome() {
        assert_eq!(table().classify_line("compiling 120 modules"), None);
    }

    #[test]
    fn transition_rule_matches() {
        let outcome = table().classify_line("Listening on :7007").unwrap();
        assert_eq!(outcome.transition, Some(ComponentStatus::Running));
        assert!(!outcome.error);
    }

    #[test]
    fn error_marker_keeps_state() {
        let outcome = table().classify_line("ERROR: something broke").unwrap();
        assert_eq!(outcome.transition, None);
        assert!(outcome.error);
    }

    #[test]
    fn regex_rule_matches_case_insensitively() {
        let outcome = table().classify_line("DEPRECATION notice").unwrap();
        assert!(outcome.warning);
    }

    #[test]
    fn last_matching_transition_in_table_order_wins() {
        let outcome = table()
            .classify_line("Listening on :7007 but better-sqlite3 missing")
            .unwrap();
        assert_eq!(outcome.transition, Some(ComponentStatus::Degraded));
        assert!(outcome.error);
    }

    #[test]
    fn invalid_regex_is_a_config_error() {
        let err = PatternTable::from_specs("api", &[PatternSpec::regex("(unclosed")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn spec_needs_exactly_one_matcher() {
        let both = PatternSpec {
            contains: Some("a".to_string()),
            regex: Some("b".to_string()),
            ..PatternSpec::default()
        };
        assert_eq!(
            both.compile("api").unwrap_err(),
            ConfigError::AmbiguousPattern("api".to_string())
        );
        assert!(PatternSpec::default().compile("api").is_err());
    }

    #[test]
    fn spec_deserializes_from_config() {
        let spec: PatternSpec = serde_json::from_str(
            r#"{"contains": "webpack compiled successfully", "status": "running"}"#,
        )
        .unwrap();
        assert_eq!(spec.status, Some(ComponentStatus::Running));
        assert_eq!(spec.severity, Severity::Info);
    }
}
