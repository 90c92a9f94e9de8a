//! Configuration and distraction validation

use crate::schema::{RawConfig, RawDistraction};
use thiserror::Error;
use tracing::debug;
use warden_api::{DistractionEntry, ANY_DOMAIN};
use warden_host_api::AppCatalog;
use warden_util::{TimeSpec, TimeSpecError};

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Distraction name cannot be empty")]
    EmptyName,

    #[error("'*' alone is not a valid distraction; use '*.*' to match every domain")]
    BareWildcard,

    #[error("'{0}' is neither a domain pattern nor a known application")]
    UnknownTarget(String),

    #[error("Entry '{name}': {source}")]
    InvalidTime {
        name: String,
        #[source]
        source: TimeSpecError,
    },

    #[error("{list} entry '{name}': {message}")]
    InvalidInitialEntry {
        list: &'static str,
        name: String,
        message: String,
    },

    #[error("tick_interval_ms must be greater than zero")]
    InvalidTickInterval,

    #[error("rate_limit_per_second must be greater than zero")]
    InvalidRateLimit,
}

/// Check a proposed blocklist/whitelist entry.
///
/// Names that are not domain patterns must be known to `catalog`.
pub fn validate_distraction(
    entry: &DistractionEntry,
    catalog: &dyn AppCatalog,
) -> Result<(), ValidationError> {
    validate_name(&entry.name)?;
    validate_time(&entry.name, entry.time.as_deref())?;

    if is_domain_pattern(&entry.name) || catalog.is_known(&entry.name) {
        Ok(())
    } else {
        Err(ValidationError::UnknownTarget(entry.name.clone()))
    }
}

/// Boolean form of [`validate_distraction`]; never fails loudly.
pub fn is_valid_distraction(entry: &DistractionEntry, catalog: &dyn AppCatalog) -> bool {
    match validate_distraction(entry, catalog) {
        Ok(()) => true,
        Err(e) => {
            debug!(name = %entry.name, error = %e, "Rejected distraction");
            false
        }
    }
}

/// `*.*`, `*.<suffix>`, or a fully qualified domain name
pub fn is_domain_pattern(name: &str) -> bool {
    if name == ANY_DOMAIN {
        return true;
    }
    match name.strip_prefix("*.") {
        Some(suffix) => has_valid_labels(suffix, 1),
        None => has_valid_labels(name, 2),
    }
}

fn has_valid_labels(name: &str, min_labels: usize) -> bool {
    if name.is_empty() || name.len() > MAX_DOMAIN_LEN {
        return false;
    }

    let mut count = 0;
    for label in name.split('.') {
        if !is_valid_label(label) {
            return false;
        }
        count += 1;
    }
    count >= min_labels
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name == "*" {
        return Err(ValidationError::BareWildcard);
    }
    Ok(())
}

fn validate_time(name: &str, time: Option<&str>) -> Result<Option<TimeSpec>, ValidationError> {
    time.map(warden_util::classify)
        .transpose()
        .map_err(|source| ValidationError::InvalidTime {
            name: name.to_string(),
            source,
        })
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.daemon.tick_interval_ms == Some(0) {
        errors.push(ValidationError::InvalidTickInterval);
    }
    if config.daemon.rate_limit_per_second == Some(0) {
        errors.push(ValidationError::InvalidRateLimit);
    }

    for entry in &config.initial_policy.blocklist {
        errors.extend(validate_initial_entry("blocklist", entry));
    }
    for entry in &config.initial_policy.whitelist {
        errors.extend(validate_initial_entry("whitelist", entry));
    }

    errors
}

// No catalog exists at config time, so bare app names are accepted as-is.
fn validate_initial_entry(list: &'static str, entry: &RawDistraction) -> Option<ValidationError> {
    let invalid = |message: String| ValidationError::InvalidInitialEntry {
        list,
        name: entry.name.clone(),
        message,
    };

    if let Err(e) = validate_name(&entry.name) {
        return Some(invalid(e.to_string()));
    }

    match validate_time(&entry.name, entry.time.as_deref()) {
        Err(e) => Some(invalid(e.to_string())),
        Ok(Some(TimeSpec::Duration { .. })) => Some(invalid(
            "durations are relative to creation; use an interval like 9h-17h".into(),
        )),
        Ok(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawDaemonConfig, RawInitialPolicy};
    use warden_host_api::MockCatalog;

    fn entry(name: &str) -> DistractionEntry {
        DistractionEntry::new(name)
    }

    #[test]
    fn rejects_empty_and_bare_wildcard() {
        let catalog = MockCatalog::new();
        assert!(!is_valid_distraction(&entry(""), &catalog));
        assert!(!is_valid_distraction(&entry("*"), &catalog));
        assert!(matches!(
            validate_distraction(&entry("*"), &catalog),
            Err(ValidationError::BareWildcard)
        ));
    }

    #[test]
    fn accepts_domain_patterns() {
        let catalog = MockCatalog::new();
        for name in ["*.*", "*.example.com", "example.com", "*.com", "sub.example.co.uk"] {
            assert!(is_valid_distraction(&entry(name), &catalog), "{}", name);
        }
    }

    #[test]
    fn rejects_malformed_domains() {
        let catalog = MockCatalog::new();
        for name in ["*.", "*..com", "example..com", "-bad.com", "bad-.com", "exa mple.com", "*.*.com"] {
            assert!(!is_valid_distraction(&entry(name), &catalog), "{}", name);
        }
    }

    #[test]
    fn app_names_need_the_catalog() {
        let catalog = MockCatalog::with_apps(["chromium"]);

        assert!(is_valid_distraction(&entry("chromium").with_time("1h30m"), &catalog));
        assert!(is_valid_distraction(&entry("chromium").with_time("9h-17h"), &catalog));
        assert!(matches!(
            validate_distraction(&entry("steam"), &catalog),
            Err(ValidationError::UnknownTarget(ref n)) if n == "steam"
        ));
    }

    #[test]
    fn failing_catalog_rejects_app_names_only() {
        let catalog = MockCatalog::with_apps(["chromium"]);
        catalog.set_fail_enumeration(true);

        assert!(!is_valid_distraction(&entry("chromium"), &catalog));
        assert!(is_valid_distraction(&entry("example.com"), &catalog));
    }

    #[test]
    fn rejects_unparseable_time() {
        let catalog = MockCatalog::with_apps(["chromium"]);
        for time in ["", "soon", "25h-26h", "1m1h", "10s"] {
            let e = entry("example.com").with_time(time);
            assert!(!is_valid_distraction(&e, &catalog), "{}", time);
        }
        assert!(matches!(
            validate_distraction(&entry("chromium").with_time("later"), &catalog),
            Err(ValidationError::InvalidTime { .. })
        ));
    }

    #[test]
    fn config_validation_collects_errors() {
        let config = RawConfig {
            config_version: 1,
            daemon: RawDaemonConfig {
                tick_interval_ms: Some(0),
                ..Default::default()
            },
            initial_policy: RawInitialPolicy {
                blocklist: vec![
                    RawDistraction {
                        name: "*".into(),
                        time: None,
                    },
                    RawDistraction {
                        name: "example.com".into(),
                        time: Some("30m".into()),
                    },
                    RawDistraction {
                        name: "steam".into(),
                        time: Some("9h-17h".into()),
                    },
                ],
                whitelist: vec![RawDistraction {
                    name: "".into(),
                    time: None,
                }],
            },
        };

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidTickInterval)));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidInitialEntry { list: "whitelist", .. }
        )));
    }
}
