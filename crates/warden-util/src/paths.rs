//! Default paths for warden components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/warden/wardend.sock` or `/tmp/warden-$USER/wardend.sock`
//! - Policy: `$XDG_DATA_HOME/warden/policy.json` or `~/.local/share/warden/policy.json`
//! - Config: `$XDG_CONFIG_HOME/warden/config.toml` or `~/.config/warden/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const WARDEN_SOCKET_ENV: &str = "WARDEN_SOCKET";

/// Environment variable for overriding the policy document path
pub const WARDEN_POLICY_ENV: &str = "WARDEN_POLICY";

const SOCKET_FILENAME: &str = "wardend.sock";
const POLICY_FILENAME: &str = "policy.json";
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "warden";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$WARDEN_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/warden/wardend.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/warden-$USER/wardend.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(WARDEN_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking the WARDEN_SOCKET env var.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default policy document path.
///
/// Order of precedence:
/// 1. `$WARDEN_POLICY` environment variable (if set)
/// 2. `$XDG_DATA_HOME/warden/policy.json`
/// 3. `~/.local/share/warden/policy.json`
pub fn default_policy_path() -> PathBuf {
    if let Ok(path) = std::env::var(WARDEN_POLICY_ENV) {
        return PathBuf::from(path);
    }

    policy_path_without_env()
}

/// Get the policy path without checking the WARDEN_POLICY env var.
pub fn policy_path_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR).join(POLICY_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR)
            .join(POLICY_FILENAME);
    }

    PathBuf::from("/tmp").join(APP_DIR).join(POLICY_FILENAME)
}

/// Get the default daemon configuration path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_warden() {
        let path = socket_path_without_env();
        assert!(path.to_string_lossy().contains("warden"));
        assert!(path.to_string_lossy().ends_with("wardend.sock"));
    }

    #[test]
    fn policy_path_is_json() {
        let path = policy_path_without_env();
        assert!(path.to_string_lossy().contains("warden"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = default_config_path();
        assert_eq!(path.file_name().and_then(|f| f.to_str()), Some("config.toml"));
    }
}
