//! Validated daemon settings

use crate::schema::{RawConfig, RawDaemonConfig, RawDistraction};
use std::path::PathBuf;
use std::time::Duration;
use warden_api::{DistractionEntry, PolicyDocument};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 30;

/// Validated settings ready for use by the daemon
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub daemon: DaemonSettings,

    /// Document written when no policy exists yet
    pub initial_policy: PolicyDocument,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonSettings::from_raw(raw.daemon),
            initial_policy: PolicyDocument {
                blocklist: raw
                    .initial_policy
                    .blocklist
                    .into_iter()
                    .map(convert_distraction)
                    .collect(),
                whitelist: raw
                    .initial_policy
                    .whitelist
                    .into_iter()
                    .map(convert_distraction)
                    .collect(),
                shield: false,
                password_hash: None,
            },
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub socket_path: PathBuf,
    pub policy_path: PathBuf,
    pub tick_interval: Duration,
    pub rate_limit_per_second: u32,
}

impl DaemonSettings {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        Self {
            socket_path: raw
                .socket_path
                .unwrap_or_else(warden_util::socket_path_without_env),
            policy_path: raw
                .policy_path
                .unwrap_or_else(warden_util::policy_path_without_env),
            tick_interval: raw
                .tick_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TICK_INTERVAL),
            rate_limit_per_second: raw
                .rate_limit_per_second
                .unwrap_or(DEFAULT_RATE_LIMIT_PER_SECOND),
        }
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self::from_raw(RawDaemonConfig::default())
    }
}

fn convert_distraction(raw: RawDistraction) -> DistractionEntry {
    DistractionEntry {
        name: raw.name,
        time: raw.time,
        timeout: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawInitialPolicy;

    #[test]
    fn defaults_fill_missing_values() {
        let settings = DaemonSettings::default();
        assert_eq!(settings.tick_interval, Duration::from_secs(1));
        assert_eq!(settings.rate_limit_per_second, 30);
        assert!(settings.policy_path.to_string_lossy().ends_with("policy.json"));
    }

    #[test]
    fn initial_policy_is_converted() {
        let raw = RawConfig {
            config_version: 1,
            daemon: RawDaemonConfig {
                policy_path: Some("/tmp/p.json".into()),
                tick_interval_ms: Some(250),
                ..Default::default()
            },
            initial_policy: RawInitialPolicy {
                blocklist: vec![RawDistraction {
                    name: "*.reddit.com".into(),
                    time: Some("9h-17h".into()),
                }],
                whitelist: vec![],
            },
        };

        let settings = Settings::from_raw(raw);
        assert_eq!(settings.daemon.policy_path, PathBuf::from("/tmp/p.json"));
        assert_eq!(settings.daemon.tick_interval, Duration::from_millis(250));
        assert_eq!(
            settings.initial_policy.blocklist,
            vec![DistractionEntry::new("*.reddit.com").with_time("9h-17h")]
        );
        assert!(!settings.initial_policy.shield);
    }
}
