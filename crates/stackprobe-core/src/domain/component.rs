//! Component domain types.
//!
//! A component is one supervised unit of the monitored application (its
//! primary server, its API layer, ...). Components are created with status
//! `unknown` when a session starts and only change through reducer updates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What role a component plays in the monitored application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Frontend,
    Backend,
    Api,
    Catalog,
    Templates,
    Plugins,
}

impl ComponentKind {
    /// Human-readable category label used in reports and recommendations.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Frontend => "Frontend",
            Self::Backend => "Backend",
            Self::Api => "API",
            Self::Catalog => "Catalog",
            Self::Templates => "Templates",
            Self::Plugins => "Plugins",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Health state of a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Nothing observed yet.
    Unknown,
    /// Process launched, no success marker seen.
    Starting,
    /// A success marker appeared on the output stream.
    Running,
    /// Every configured endpoint answered correctly.
    Healthy,
    /// Some, but not all, endpoints answered correctly.
    Partial,
    /// Endpoints answer but expected content is missing.
    Incomplete,
    /// Native dependencies failed; functionality impaired but not absent.
    Degraded,
    /// Never became reachable within its startup window.
    Unreachable,
    /// Could not be launched, or no endpoint answered.
    Failed,
}

impl ComponentStatus {
    /// Lowercase name as it appears in reports and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Healthy => "healthy",
            Self::Partial => "partial",
            Self::Incomplete => "incomplete",
            Self::Degraded => "degraded",
            Self::Unreachable => "unreachable",
            Self::Failed => "failed",
        }
    }

    /// Status icon for the rendered report.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Healthy | Self::Running => "✅",
            Self::Partial | Self::Incomplete | Self::Starting => "⚠️",
            Self::Degraded => "🔧",
            Self::Unreachable | Self::Failed => "❌",
            Self::Unknown => "❓",
        }
    }

    /// `true` for states that need no remediation.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Healthy | Self::Running)
    }

    /// `true` for states that are always a critical issue.
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed | Self::Unreachable)
    }

    /// `true` for states that are critical only on essential components.
    #[must_use]
    pub const fn is_impaired(self) -> bool {
        matches!(self, Self::Partial | Self::Incomplete)
    }

    /// `true` while the component has not settled on an observed state.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Unknown | Self::Starting)
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: ComponentStatus,
    pub to: ComponentStatus,
    /// The line or probe summary that caused the change.
    pub signal: String,
    /// Run-wide detection order.
    pub seq: u64,
}

/// A supervised component and everything observed about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    pub kind: ComponentKind,
    /// Partial/incomplete states count as critical for essential components.
    pub essential: bool,
    pub status: ComponentStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// The signal behind the current status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_signal: Option<String>,
    pub transitions: Vec<StatusTransition>,
}

impl Component {
    /// Create a component in the `unknown` state.
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            essential: false,
            status: ComponentStatus::Unknown,
            errors: Vec::new(),
            warnings: Vec::new(),
            last_signal: None,
            transitions: Vec::new(),
        }
    }

    /// Mark the component as essential.
    #[must_use]
    pub const fn essential(mut self, essential: bool) -> Self {
        self.essential = essential;
        self
    }

    /// Move to `status`, recording the transition.
    ///
    /// The signal is remembered even when the status does not change, so the
    /// report always names the most recent reason.
    pub fn transition(&mut self, status: ComponentStatus, signal: impl Into<String>, seq: u64) {
        let signal = signal.into();
        if status != self.status {
            self.transitions.push(StatusTransition {
                from: self.status,
                to: status,
                signal: signal.clone(),
                seq,
            });
            self.status = status;
        }
        self.last_signal = Some(signal);
    }

    /// Detection order of the current status, if it was ever entered.
    #[must_use]
    pub fn detected_seq(&self) -> Option<u64> {
        self.transitions
            .iter()
            .rev()
            .find(|t| t.to == self.status)
            .map(|t| t.seq)
    }

    /// `true` if the component ever passed through `status`.
    #[must_use]
    pub fn visited(&self, status: ComponentStatus) -> bool {
        self.transitions.iter().any(|t| t.to == status)
    }
}
