//! Monitor configuration and validation.
//!
//! A [`MonitorConfig`] describes which components make up the monitored
//! stack, how to start them, where they listen and what to probe. It is
//! plain data loaded from JSON; [`validate_config`] checks it before a run.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::{PatternSpec, PatternTable, default_table};
use crate::domain::{Component, ComponentKind};
use crate::error::ConfigError;

/// Default host for readiness checks.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default frontend port.
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;

/// Default backend port.
pub const DEFAULT_BACKEND_PORT: u16 = 7007;

/// Top-level monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Host used for TCP readiness checks.
    pub host: String,

    /// How long each component may take to open its port.
    pub startup_timeout_ms: u64,

    /// Readiness poll cadence.
    pub poll_interval_ms: u64,

    /// Per-request probe timeout.
    pub probe_timeout_ms: u64,

    /// Hard deadline for the whole run.
    pub run_deadline_ms: u64,

    /// How long to keep reading output after teardown.
    pub drain_timeout_ms: u64,

    pub components: Vec<ComponentSpec>,

    /// Optional external configuration validator command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<ProcessSpec>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            startup_timeout_ms: 45_000,
            poll_interval_ms: 1_000,
            probe_timeout_ms: 10_000,
            run_deadline_ms: 180_000,
            drain_timeout_ms: 2_000,
            components: Vec::new(),
            validator: None,
        }
    }
}

impl MonitorConfig {
    /// Default timings plus the standard frontend/backend topology.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            components: default_components(),
            ..Self::default()
        }
    }

    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    #[must_use]
    pub const fn run_deadline(&self) -> Duration {
        Duration::from_millis(self.run_deadline_ms)
    }

    #[must_use]
    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Look up a component by name.
    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// How to launch a process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessSpec {
    pub command: String,
    pub args: Vec<String>,
    /// Added to the inherited environment.
    pub env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl ProcessSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Command line for logs and error text.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Condition a response body must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyPredicate {
    /// Body parses as JSON.
    Structured,
    /// Body is a JSON array with at least one element.
    NonEmptyArray,
    /// Body is a JSON array and some element has `value` at `pointer`.
    ArrayContains { pointer: String, value: Value },
}

impl BodyPredicate {
    /// Check `body`, returning a description of the failure.
    pub fn check(&self, body: &str) -> Result<(), String> {
        let json: Value =
            serde_json::from_str(body).map_err(|e| format!("body is not valid JSON: {e}"))?;

        match self {
            Self::Structured => Ok(()),
            Self::NonEmptyArray => match json.as_array() {
                Some(items) if !items.is_empty() => Ok(()),
                Some(_) => Err("array is empty".to_string()),
                None => Err("body is not an array".to_string()),
            },
            Self::ArrayContains { pointer, value } => {
                let items = json
                    .as_array()
                    .ok_or_else(|| "body is not an array".to_string())?;
                if items.iter().any(|item| item.pointer(pointer) == Some(value)) {
                    Ok(())
                } else {
                    Err(format!("no element has {pointer} = {value}"))
                }
            }
        }
    }
}

/// One HTTP endpoint to probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<BodyPredicate>,
}

impl EndpointSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expect: None,
        }
    }

    #[must_use]
    pub fn expect(mut self, predicate: BodyPredicate) -> Self {
        self.expect = Some(predicate);
        self
    }
}

/// Content check run after every endpoint succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCheck {
    pub url: String,
    pub predicate: BodyPredicate,
    /// Warning text used when the check fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A named navigation path checked like a user would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFlow {
    pub name: String,
    pub url: String,
}

impl UserFlow {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One monitored component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentSpec {
    pub name: String,
    pub kind: ComponentKind,
    /// Partial or incomplete states count as critical.
    pub essential: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_port: Option<u16>,
    pub endpoints: Vec<EndpointSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_check: Option<ContentCheck>,
    pub user_flows: Vec<UserFlow>,
    /// Output rules; the kind's default table applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<PatternSpec>>,
}

impl Default for ComponentSpec {
    fn default() -> Self {
        Self::new("", ComponentKind::Api)
    }
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            essential: false,
            process: None,
            ready_port: None,
            endpoints: Vec::new(),
            content_check: None,
            user_flows: Vec::new(),
            patterns: None,
        }
    }

    /// Fresh component state for a run.
    pub fn component(&self) -> Component {
        Component::new(self.name.clone(), self.kind).essential(self.essential)
    }

    /// Compiled output rules for this component.
    pub fn pattern_table(&self) -> Result<PatternTable, ConfigError> {
        match &self.patterns {
            Some(specs) => PatternTable::from_specs(&self.name, specs),
            None => Ok(default_table(self.kind)),
        }
    }

    fn urls(&self) -> impl Iterator<Item = &str> {
        self.endpoints
            .iter()
            .map(|e| e.url.as_str())
            .chain(self.content_check.iter().map(|c| c.url.as_str()))
            .chain(self.user_flows.iter().map(|f| f.url.as_str()))
    }
}

/// Validate a monitor configuration.
pub fn validate_config(config: &MonitorConfig) -> Result<(), ConfigError> {
    let durations = [
        ("startup_timeout_ms", config.startup_timeout_ms),
        ("poll_interval_ms", config.poll_interval_ms),
        ("probe_timeout_ms", config.probe_timeout_ms),
        ("run_deadline_ms", config.run_deadline_ms),
    ];
    if let Some(&(field, _)) = durations.iter().find(|(_, ms)| *ms == 0) {
        return Err(ConfigError::ZeroDuration { field });
    }
    if config.poll_interval_ms > config.startup_timeout_ms {
        return Err(ConfigError::IntervalExceedsTimeout {
            interval_ms: config.poll_interval_ms,
            timeout_ms: config.startup_timeout_ms,
        });
    }

    if config.components.is_empty() {
        return Err(ConfigError::NoComponents);
    }

    let mut seen = HashSet::new();
    for component in &config.components {
        if component.name.trim().is_empty() {
            return Err(ConfigError::EmptyComponentName);
        }
        if !seen.insert(component.name.as_str()) {
            return Err(ConfigError::DuplicateComponent(component.name.clone()));
        }
        if component.ready_port == Some(0) {
            return Err(ConfigError::InvalidPort(0));
        }
        if component
            .process
            .as_ref()
            .is_some_and(|p| p.command.trim().is_empty())
        {
            return Err(ConfigError::EmptyCommand(component.name.clone()));
        }
        if let Some(url) = component.urls().find(|url| !is_http_url(url)) {
            return Err(ConfigError::InvalidEndpoint {
                component: component.name.clone(),
                url: url.to_string(),
            });
        }
        component.pattern_table()?;
    }

    if config
        .validator
        .as_ref()
        .is_some_and(|p| p.command.trim().is_empty())
    {
        return Err(ConfigError::EmptyCommand("validator".to_string()));
    }

    Ok(())
}

fn is_http_url(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}

fn default_components() -> Vec<ComponentSpec> {
    let frontend = format!("http://localhost:{DEFAULT_FRONTEND_PORT}");
    let backend = format!("http://localhost:{DEFAULT_BACKEND_PORT}");
    let catalog_entities = format!("{backend}/api/catalog/entities");

    vec![
        ComponentSpec {
            essential: true,
            process: Some(
                ProcessSpec::new("yarn")
                    .args(["workspace", "app", "start"])
                    .env("NODE_ENV", "development"),
            ),
            ready_port: Some(DEFAULT_FRONTEND_PORT),
            endpoints: vec![EndpointSpec::new(format!("{frontend}/"))],
            user_flows: [
                ("Navigate to catalog", "/catalog"),
                ("Filter catalog by component", "/catalog?filters%5Bkind%5D=component"),
                ("Filter catalog by system", "/catalog?filters%5Bkind%5D=system"),
                ("Open create page", "/create"),
                ("Open search", "/search"),
            ]
            .into_iter()
            .map(|(name, path)| UserFlow::new(name, format!("{frontend}{path}")))
            .collect(),
            ..ComponentSpec::new("frontend", ComponentKind::Frontend)
        },
        ComponentSpec {
            process: Some(
                ProcessSpec::new("yarn")
                    .args(["workspace", "backend", "start"])
                    .env("NODE_ENV", "development"),
            ),
            ready_port: Some(DEFAULT_BACKEND_PORT),
            ..ComponentSpec::new("backend", ComponentKind::Backend)
        },
        ComponentSpec {
            ready_port: Some(DEFAULT_BACKEND_PORT),
            endpoints: [
                "/api/catalog/entities",
                "/api/catalog/entities/by-name/component/default/desktop-projects",
                "/api/catalog/locations",
                "/api/auth/providers",
                "/api/techdocs/static/docs",
            ]
            .into_iter()
            .map(|path| EndpointSpec::new(format!("{backend}{path}")))
            .collect(),
            ..ComponentSpec::new("api", ComponentKind::Api)
        },
        ComponentSpec {
            essential: true,
            ready_port: Some(DEFAULT_BACKEND_PORT),
            endpoints: vec![
                EndpointSpec::new(catalog_entities.clone()).expect(BodyPredicate::NonEmptyArray),
            ],
            content_check: Some(ContentCheck {
                url: catalog_entities.clone(),
                predicate: BodyPredicate::ArrayContains {
                    pointer: "/spec/owner".to_string(),
                    value: Value::String("user:personal".to_string()),
                },
                message: Some("Catalog has no entities owned by user:personal".to_string()),
            }),
            ..ComponentSpec::new("catalog", ComponentKind::Catalog)
        },
        ComponentSpec {
            ready_port: Some(DEFAULT_BACKEND_PORT),
            endpoints: vec![
                EndpointSpec::new(format!("{catalog_entities}?filter=kind=template"))
                    .expect(BodyPredicate::Structured),
            ],
            content_check: Some(ContentCheck {
                url: format!("{catalog_entities}?filter=kind=template"),
                predicate: BodyPredicate::NonEmptyArray,
                message: Some("No templates found".to_string()),
            }),
            ..ComponentSpec::new("templates", ComponentKind::Templates)
        },
        ComponentSpec {
            ready_port: Some(DEFAULT_FRONTEND_PORT),
            endpoints: ["/catalog", "/api-docs", "/docs", "/create", "/search"]
                .into_iter()
                .map(|path| EndpointSpec::new(format!("{frontend}{path}")))
                .collect(),
            ..ComponentSpec::new("plugins", ComponentKind::Plugins)
        },
    ]
}
