//! Host collaborator traits

use std::collections::BTreeSet;
use thiserror::Error;

/// Errors from host collaborators
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("Enforcement failed: {0}")]
    EnforcementFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HostResult<T> = Result<T, HostError>;

/// Source of installed or running application identifiers.
///
/// The distraction validator consults it for names that are not
/// domain patterns; the daemon uses `running_apps` to decide what to watch.
pub trait AppCatalog: Send + Sync {
    /// Every application identifier currently known to the host
    fn known_apps(&self) -> HostResult<BTreeSet<String>>;

    /// Applications with at least one live process
    fn running_apps(&self) -> HostResult<BTreeSet<String>> {
        self.known_apps()
    }

    fn is_known(&self, name: &str) -> bool {
        self.known_apps()
            .map(|apps| apps.contains(name))
            .unwrap_or(false)
    }
}

/// Applies OS-level effects when a block decision flips.
///
/// The policy core only decides; implementors edit hosts files,
/// terminate processes, and so on.
pub trait Enforcer: Send + Sync {
    fn on_block_decision_changed(&self, name: &str, blocked: bool) -> HostResult<()>;
}
