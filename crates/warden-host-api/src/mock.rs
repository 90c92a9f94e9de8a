//! Mock collaborators for testing

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::{AppCatalog, Enforcer, HostError, HostResult};

/// In-memory application catalog
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    installed: Arc<Mutex<BTreeSet<String>>>,
    running: Arc<Mutex<BTreeSet<String>>>,

    /// Configure enumeration to fail
    pub fail_enumeration: Arc<Mutex<bool>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apps<I, S>(apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let catalog = Self::new();
        for app in apps {
            catalog.install(app);
        }
        catalog
    }

    pub fn install(&self, app: impl Into<String>) {
        self.installed.lock().unwrap().insert(app.into());
    }

    /// Mark an app as running (and installed)
    pub fn start(&self, app: impl Into<String>) {
        let app = app.into();
        self.installed.lock().unwrap().insert(app.clone());
        self.running.lock().unwrap().insert(app);
    }

    pub fn stop(&self, app: &str) {
        self.running.lock().unwrap().remove(app);
    }

    pub fn set_fail_enumeration(&self, fail: bool) {
        *self.fail_enumeration.lock().unwrap() = fail;
    }

    fn check_failure(&self) -> HostResult<()> {
        if *self.fail_enumeration.lock().unwrap() {
            return Err(HostError::EnumerationFailed("Mock enumeration failure".into()));
        }
        Ok(())
    }
}

impl AppCatalog for MockCatalog {
    fn known_apps(&self) -> HostResult<BTreeSet<String>> {
        self.check_failure()?;
        Ok(self.installed.lock().unwrap().clone())
    }

    fn running_apps(&self) -> HostResult<BTreeSet<String>> {
        self.check_failure()?;
        Ok(self.running.lock().unwrap().clone())
    }
}

/// Enforcer that records every decision it receives
#[derive(Debug, Clone, Default)]
pub struct MockEnforcer {
    calls: Arc<Mutex<Vec<(String, bool)>>>,

    /// Configure enforcement to fail
    pub fail_enforce: Arc<Mutex<bool>>,
}

impl MockEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decisions received so far, oldest first
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl Enforcer for MockEnforcer {
    fn on_block_decision_changed(&self, name: &str, blocked: bool) -> HostResult<()> {
        if *self.fail_enforce.lock().unwrap() {
            return Err(HostError::EnforcementFailed("Mock enforcement failure".into()));
        }
        self.calls.lock().unwrap().push((name.to_string(), blocked));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_tracks_installed_and_running() {
        let catalog = MockCatalog::with_apps(["firefox"]);
        catalog.start("chromium");

        assert!(catalog.is_known("firefox"));
        assert!(catalog.is_known("chromium"));
        assert!(!catalog.is_known("steam"));

        let running = catalog.running_apps().unwrap();
        assert_eq!(running.len(), 1);
        assert!(running.contains("chromium"));

        catalog.stop("chromium");
        assert!(catalog.running_apps().unwrap().is_empty());
    }

    #[test]
    fn failing_catalog_knows_nothing() {
        let catalog = MockCatalog::with_apps(["firefox"]);
        catalog.set_fail_enumeration(true);

        assert!(catalog.known_apps().is_err());
        assert!(!catalog.is_known("firefox"));
    }

    #[test]
    fn enforcer_records_calls() {
        let enforcer = MockEnforcer::new();
        enforcer.on_block_decision_changed("a.com", true).unwrap();
        enforcer.on_block_decision_changed("a.com", false).unwrap();

        assert_eq!(
            enforcer.calls(),
            vec![("a.com".to_string(), true), ("a.com".to_string(), false)]
        );
    }
}
