//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Daemon-level settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// Policy written on first run, when no policy document exists yet
    #[serde(default)]
    pub initial_policy: RawInitialPolicy,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/warden/wardend.sock)
    pub socket_path: Option<PathBuf>,

    /// Policy document path (default: $XDG_DATA_HOME/warden/policy.json)
    pub policy_path: Option<PathBuf>,

    /// How often running apps are re-evaluated, in milliseconds
    pub tick_interval_ms: Option<u64>,

    /// Requests per second allowed per IPC client
    pub rate_limit_per_second: Option<u32>,
}

/// Seed policy lists
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawInitialPolicy {
    #[serde(default)]
    pub blocklist: Vec<RawDistraction>,

    #[serde(default)]
    pub whitelist: Vec<RawDistraction>,
}

/// A seed entry. Durations are relative to creation and not allowed here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawDistraction {
    pub name: String,

    /// Daily interval such as "9h-17h"
    pub time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            config_version = 1

            [daemon]
            socket_path = "/tmp/warden-test/wardend.sock"
            tick_interval_ms = 500

            [initial_policy]
            blocklist = [
                { name = "*.reddit.com", time = "9h-17h" },
                { name = "steam" },
            ]
            whitelist = [{ name = "docs.rs" }]
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.daemon.tick_interval_ms, Some(500));
        assert!(config.daemon.policy_path.is_none());
        assert_eq!(config.initial_policy.blocklist.len(), 2);
        assert_eq!(config.initial_policy.blocklist[0].time.as_deref(), Some("9h-17h"));
        assert_eq!(config.initial_policy.whitelist[0].name, "docs.rs");
    }

    #[test]
    fn sections_are_optional() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.initial_policy.blocklist.is_empty());
        assert!(config.daemon.socket_path.is_none());
    }
}
