//! `stackprobe check-config`: validate a configuration without running it.

use std::path::Path;

use anyhow::Result;
use stackprobe_core::{ComponentSpec, MonitorConfig};

use crate::bootstrap::load_config;

fn describe(spec: &ComponentSpec) -> String {
    let port = spec
        .ready_port
        .map_or_else(|| "-".to_string(), |p| p.to_string());
    let command = spec
        .process
        .as_ref()
        .map_or_else(|| "-".to_string(), |p| p.display());
    format!(
        "{:<12} {:<10} {:<9} {:<6} {:<9} {}",
        spec.name,
        spec.kind.label(),
        if spec.essential { "yes" } else { "no" },
        port,
        spec.endpoints.len() + spec.user_flows.len(),
        command
    )
}

/// Lines printed for a valid configuration.
pub fn summary(config: &MonitorConfig) -> Vec<String> {
    let mut lines = vec![
        format!("✅ Configuration is valid ({} components)", config.components.len()),
        String::new(),
        format!(
            "{:<12} {:<10} {:<9} {:<6} {:<9} Command",
            "Name", "Kind", "Essential", "Port", "Probes"
        ),
    ];
    lines.extend(config.components.iter().map(describe));
    if let Some(validator) = &config.validator {
        lines.push(String::new());
        lines.push(format!("Config validator: {}", validator.display()));
    }
    lines
}

pub fn execute(config: Option<&Path>) -> Result<i32> {
    let config = load_config(config)?;
    for line in summary(&config) {
        println!("{line}");
    }
    Ok(0)
}
