//! Configuration loading and management

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Complete configuration for the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// GRIP control endpoint of the proxy, e.g. `http://localhost:5561`
    ///
    /// Consumed by `EpcpPublisher::from_config` on the publish path; the
    /// request-handling side never talks to the control endpoint.
    #[serde(default = "default_control_url")]
    pub grip_control_url: String,

    /// Sub-protocol advertised on OPEN
    #[serde(default = "default_subprotocol")]
    pub subprotocol: String,

    /// Seconds of inactivity before the janitor expires a record
    #[serde(default = "default_record_lifetime")]
    pub record_lifetime_seconds: u64,

    /// Seconds between janitor sweeps
    #[serde(default = "default_janitor_interval")]
    pub janitor_interval_seconds: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_control_url() -> String {
    "http://localhost:5561".to_string()
}

fn default_subprotocol() -> String {
    "graphql-ws".to_string()
}

fn default_record_lifetime() -> u64 {
    300
}

fn default_janitor_interval() -> u64 {
    60
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            grip_control_url: default_control_url(),
            subprotocol: default_subprotocol(),
            record_lifetime_seconds: default_record_lifetime(),
            janitor_interval_seconds: default_janitor_interval(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = BridgeConfig::from_yaml_str("{}").unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.grip_control_url, "http://localhost:5561");
        assert_eq!(config.subprotocol, "graphql-ws");
        assert_eq!(config.record_lifetime_seconds, 300);
        assert_eq!(config.janitor_interval_seconds, 60);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
grip_control_url: "http://pushpin:5561"
record_lifetime_seconds: 120
"#;
        let config = BridgeConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.grip_control_url, "http://pushpin:5561");
        assert_eq!(config.record_lifetime_seconds, 120);
        assert_eq!(config.subprotocol, "graphql-ws");
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = BridgeConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = BridgeConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.grip_control_url, config.grip_control_url);
        assert_eq!(parsed.record_lifetime_seconds, config.record_lifetime_seconds);
    }
}
