//! Policy engine
//!
//! Every mutation takes the same path: load, prune, validate new entries,
//! pass through the shield guard, merge into the store.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use warden_api::{DistractionEntry, PolicyDocument, PolicyPatch, RejectedField};
use warden_config::{validate_distraction, ValidationError};
use warden_host_api::AppCatalog;
use warden_store::{PolicyBackend, PolicyStore, StoreError};
use warden_util::{format_duration, TimeSpec, TimeSpecError, WardenError};

use crate::{authorize, verify_password, Matcher, PasswordHasher, Sha256Hasher};

/// Core errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid distraction: {0}")]
    InvalidDistraction(#[from] ValidationError),

    #[error(transparent)]
    Time(#[from] TimeSpecError),
}

impl From<CoreError> for WardenError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Store(e) => e.into(),
            CoreError::InvalidDistraction(e) => WardenError::invalid_distraction(e.to_string()),
            CoreError::Time(e) => e.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Result of a merge: what was written and what the shield refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub document: PolicyDocument,
    pub rejected: BTreeSet<RejectedField>,
    /// Whether the written document differs from the live one before the merge
    pub changed: bool,
}

impl MergeOutcome {
    pub fn fully_applied(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// The policy engine
pub struct PolicyEngine<B> {
    store: PolicyStore<B>,
    catalog: Arc<dyn AppCatalog>,
    hasher: Box<dyn PasswordHasher>,
}

impl<B: PolicyBackend> PolicyEngine<B> {
    /// Create an engine hashing passwords with SHA-256
    pub fn new(store: PolicyStore<B>, catalog: Arc<dyn AppCatalog>) -> Self {
        Self::with_hasher(store, catalog, Box::new(Sha256Hasher))
    }

    pub fn with_hasher(
        store: PolicyStore<B>,
        catalog: Arc<dyn AppCatalog>,
        hasher: Box<dyn PasswordHasher>,
    ) -> Self {
        Self {
            store,
            catalog,
            hasher,
        }
    }

    /// Current document without expired entries
    pub fn policy(&self, now: i64) -> CoreResult<PolicyDocument> {
        Ok(self.store.load()?.pruned(now))
    }

    /// Compile the current document for repeated evaluation
    pub fn matcher(&self, now: i64) -> CoreResult<Matcher> {
        Ok(Matcher::compile(&self.store.load()?, now))
    }

    pub fn is_blocked(&self, name: &str, now: i64) -> CoreResult<bool> {
        Ok(self.matcher(now)?.is_blocked(name, now))
    }

    /// Add `name` to the blocklist. A duration `time` becomes an absolute timeout.
    pub fn block(&self, name: &str, time: Option<&str>, now: i64) -> CoreResult<MergeOutcome> {
        let mut entry = DistractionEntry::new(name);
        if let Some(time) = time {
            entry = entry.with_time(time);
        }
        validate_distraction(&entry, self.catalog.as_ref())?;

        if let Some(time) = time
            && let TimeSpec::Duration { seconds } = warden_util::classify(time)?
        {
            entry.timeout = Some(warden_util::resolve_timeout(time, now)?);
            debug!(
                name = %name,
                expires_in = %format_duration(Duration::from_secs(seconds)),
                "Block is temporary"
            );
        }

        let current = self.policy(now)?;
        let mut blocklist = current.blocklist;
        blocklist.push(entry);

        let outcome = self.merge(&PolicyPatch::blocklist(blocklist), None, now)?;
        info!(name = %name, time = ?time, "Blocked");
        Ok(outcome)
    }

    /// Remove every blocklist entry named `name`
    pub fn unblock(&self, name: &str, password: Option<&str>, now: i64) -> CoreResult<MergeOutcome> {
        let current = self.policy(now)?;
        let blocklist = current
            .blocklist
            .into_iter()
            .filter(|e| e.name != name)
            .collect();

        self.merge(&PolicyPatch::blocklist(blocklist), password, now)
    }

    /// Add `name` to the whitelist
    pub fn allow(&self, name: &str, password: Option<&str>, now: i64) -> CoreResult<MergeOutcome> {
        let entry = DistractionEntry::new(name);
        validate_distraction(&entry, self.catalog.as_ref())?;

        let current = self.policy(now)?;
        let mut whitelist = current.whitelist;
        if !whitelist.iter().any(|e| e.name == name) {
            whitelist.push(entry);
        }

        self.merge(&PolicyPatch::whitelist(whitelist), password, now)
    }

    /// Remove `name` from the whitelist. Always permitted.
    pub fn disallow(&self, name: &str, now: i64) -> CoreResult<MergeOutcome> {
        let current = self.policy(now)?;
        let whitelist = current
            .whitelist
            .into_iter()
            .filter(|e| e.name != name)
            .collect();

        self.merge(&PolicyPatch::whitelist(whitelist), None, now)
    }

    /// Turn shield on. The password becomes the shield password unless a
    /// different one is already set.
    pub fn enable_shield(&self, password: &str, now: i64) -> CoreResult<MergeOutcome> {
        let current = self.policy(now)?;
        let mut patch = PolicyPatch::shield(true);
        if verify_password(&current, Some(password), self.hasher.as_ref()) {
            patch.password_hash = Some(self.hasher.hash(password));
        } else {
            debug!("Shield password already set, keeping it");
        }

        self.merge(&patch, Some(password), now)
    }

    pub fn disable_shield(&self, password: &str, now: i64) -> CoreResult<MergeOutcome> {
        self.merge(&PolicyPatch::shield(false), Some(password), now)
    }

    /// Apply an arbitrary patch on behalf of a caller holding `password`
    pub fn merge(
        &self,
        patch: &PolicyPatch,
        password: Option<&str>,
        now: i64,
    ) -> CoreResult<MergeOutcome> {
        let current = self.policy(now)?;
        self.validate_new_entries(patch, &current)?;

        let authorized = authorize(patch, &current, password, self.hasher.as_ref());
        if !authorized.rejected.is_empty() {
            let rejected: Vec<String> = authorized.rejected.iter().map(|r| r.to_string()).collect();
            warn!(?rejected, "Shield is on, patch partially rejected");
        }

        let document = self.store.merge(&authorized.applied, now)?;
        let changed = document != current;
        Ok(MergeOutcome {
            document,
            rejected: authorized.rejected,
            changed,
        })
    }

    // Entries already stored verbatim were validated when they were added
    fn validate_new_entries(&self, patch: &PolicyPatch, current: &PolicyDocument) -> CoreResult<()> {
        let lists = [
            (patch.blocklist.as_deref(), &current.blocklist),
            (patch.whitelist.as_deref(), &current.whitelist),
        ];
        for (desired, stored) in lists {
            for entry in desired.unwrap_or_default() {
                if !stored.contains(entry) {
                    validate_distraction(entry, self.catalog.as_ref())?;
                }
            }
        }
        Ok(())
    }
}
