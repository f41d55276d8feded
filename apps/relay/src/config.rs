//! Relay configuration.
//!
//! Loaded from an optional YAML file, then overridden from the environment.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use yeeplayer_core::RelayConfig;

/// Relay configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on. 0 picks the first free port in 8000-8010.
    /// Override: `YEEPLAYER_BIND_PORT`
    pub bind_port: u16,

    /// Seconds between pings to each peer.
    pub heartbeat_interval: u64,

    /// Seconds of silence before a peer is dropped.
    /// Override: `YEEPLAYER_HEARTBEAT_TIMEOUT`
    pub heartbeat_timeout: u64,

    /// Frames buffered per slow peer before it starts skipping.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = RelayConfig::default();
        Self {
            bind_port: core.preferred_port,
            heartbeat_interval: core.heartbeat_interval_secs,
            heartbeat_timeout: core.heartbeat_timeout_secs,
            channel_capacity: core.channel_capacity,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies overrides from `lookup` (the process environment in production).
    ///
    /// Unparseable values are ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("YEEPLAYER_BIND_PORT").and_then(|v| v.parse().ok()) {
            self.bind_port = port;
        }
        if let Some(secs) = lookup("YEEPLAYER_HEARTBEAT_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.heartbeat_timeout = secs;
        }
    }

    /// Applies command-line flags, which win over the file and the environment.
    pub fn apply_cli(&mut self, port: Option<u16>) {
        if let Some(port) = port {
            self.bind_port = port;
        }
    }

    /// Converts to yeeplayer-core's relay config.
    pub fn to_core_config(&self) -> RelayConfig {
        RelayConfig {
            preferred_port: self.bind_port,
            heartbeat_interval_secs: self.heartbeat_interval,
            heartbeat_timeout_secs: self.heartbeat_timeout,
            channel_capacity: self.channel_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn unreadable_file_is_an_error() {
        let config = ServerConfig::from_file(Path::new("/definitely/not/here.yaml"));
        assert!(config.is_err());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_port: 9100\nheartbeat_timeout: 90").unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_port, 9100);
        assert_eq!(config.heartbeat_timeout, 90);
        assert_eq!(
            config.heartbeat_interval,
            ServerConfig::default().heartbeat_interval
        );
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_port: [not, a, port]").unwrap();
        assert!(ServerConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("YEEPLAYER_BIND_PORT", "8123"),
            ("YEEPLAYER_HEARTBEAT_TIMEOUT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.bind_port, 8123);
        assert_eq!(
            config.heartbeat_timeout,
            ServerConfig::default().heartbeat_timeout
        );
    }

    #[test]
    fn command_line_port_wins_over_environment() {
        let mut config = ServerConfig::default();
        config.apply_overrides(|key| (key == "YEEPLAYER_BIND_PORT").then(|| "8123".to_string()));

        config.apply_cli(None);
        assert_eq!(config.bind_port, 8123);

        config.apply_cli(Some(8009));
        assert_eq!(config.bind_port, 8009);
    }

    #[test]
    fn converts_to_core_config() {
        let config = ServerConfig {
            bind_port: 8005,
            heartbeat_interval: 10,
            heartbeat_timeout: 30,
            channel_capacity: 16,
        };
        let core = config.to_core_config();
        assert_eq!(core.preferred_port, 8005);
        assert_eq!(core.heartbeat_timeout_secs, 30);
        assert!(core.validate().is_ok());
    }
}
