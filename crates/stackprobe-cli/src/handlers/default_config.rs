//! `stackprobe default-config`: print the built-in configuration.

use anyhow::Result;
use stackprobe_core::MonitorConfig;

pub fn render() -> Result<String> {
    Ok(serde_json::to_string_pretty(&MonitorConfig::with_defaults())?)
}

pub fn execute() -> Result<i32> {
    println!("{}", render()?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_loads_back_as_the_defaults() {
        let json = render().unwrap();
        let parsed = MonitorConfig::from_json(&json).unwrap();
        assert_eq!(parsed, MonitorConfig::with_defaults());
    }
}
