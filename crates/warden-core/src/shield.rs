//! Shield guard
//!
//! While shield mode is on, only changes that make the policy stricter go
//! through without the password. Everything else is silently reverted and
//! reported back as a [`RejectedField`].

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::debug;
use warden_api::{DistractionEntry, PolicyDocument, PolicyPatch, RejectedField};

/// One-way digest used for the stored shield password
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;
}

/// SHA-256, lowercase hex
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl PasswordHasher for Sha256Hasher {
    fn hash(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

/// A patch after the shield has had its say
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedPatch {
    pub applied: PolicyPatch,
    pub rejected: BTreeSet<RejectedField>,
}

impl AuthorizedPatch {
    fn unchanged(patch: &PolicyPatch) -> Self {
        Self {
            applied: patch.clone(),
            rejected: BTreeSet::new(),
        }
    }
}

/// True when no hash is stored yet or `password` hashes to the stored one
pub fn verify_password(
    current: &PolicyDocument,
    password: Option<&str>,
    hasher: &dyn PasswordHasher,
) -> bool {
    match current.password_hash.as_deref() {
        None | Some("") => true,
        Some(stored) => password.is_some_and(|pw| hasher.hash(pw) == stored),
    }
}

/// Strip the parts of `patch` that would loosen a shielded policy.
///
/// `current` should already be pruned of expired entries.
pub fn authorize(
    patch: &PolicyPatch,
    current: &PolicyDocument,
    password: Option<&str>,
    hasher: &dyn PasswordHasher,
) -> AuthorizedPatch {
    if !current.shield || verify_password(current, password, hasher) {
        return AuthorizedPatch::unchanged(patch);
    }

    let mut applied = patch.clone();
    let mut rejected = BTreeSet::new();

    if applied.shield == Some(false) {
        applied.shield = None;
        rejected.insert(RejectedField::Shield);
    }

    if applied.password_hash.is_some() && applied.password_hash != current.password_hash {
        applied.password_hash = None;
        rejected.insert(RejectedField::PasswordHash);
    }

    if let Some(blocklist) = &applied.blocklist {
        let (restored, changed) = restore_blocklist(&current.blocklist, blocklist);
        if changed {
            rejected.insert(RejectedField::BlocklistRemoval);
        }
        applied.blocklist = Some(restored);
    }

    if let Some(whitelist) = &applied.whitelist {
        let (kept, dropped): (Vec<_>, Vec<_>) = whitelist
            .iter()
            .cloned()
            .partition(|e| current.whitelist.contains(e));
        if !dropped.is_empty() {
            rejected.insert(RejectedField::WhitelistAddition);
        }
        applied.whitelist = Some(kept);
    }

    if !rejected.is_empty() {
        debug!(?rejected, "Shield reverted patch fields");
    }

    AuthorizedPatch { applied, rejected }
}

// Every stored entry survives as stored. A desired entry that differs from
// all stored ones, even under a stored name, is an addition.
fn restore_blocklist(
    stored: &[DistractionEntry],
    desired: &[DistractionEntry],
) -> (Vec<DistractionEntry>, bool) {
    let removed = stored.iter().any(|e| !desired.contains(e));

    let mut restored = stored.to_vec();
    for entry in desired {
        if !restored.contains(entry) {
            restored.push(entry.clone());
        }
    }

    (restored, removed)
}
