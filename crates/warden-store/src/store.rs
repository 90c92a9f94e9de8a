//! Policy store: load, create and merge the policy document

use tracing::{debug, info};
use warden_api::{DistractionEntry, PolicyDocument, PolicyPatch};

use crate::{PolicyBackend, StoreError, StoreResult};

/// Owner of the persisted policy document
///
/// The store applies no authorization of its own. Callers pass patches
/// through the shield guard first.
pub struct PolicyStore<B> {
    backend: B,
}

impl<B: PolicyBackend> PolicyStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Read and parse the stored document
    pub fn load(&self) -> StoreResult<PolicyDocument> {
        let contents = self
            .backend
            .read()?
            .ok_or_else(|| StoreError::NotFound(self.backend.location()))?;
        parse_document(&contents)
    }

    /// Write `initial` unconditionally
    pub fn create(&self, initial: &PolicyDocument) -> StoreResult<()> {
        self.write(initial)?;
        info!(
            location = %self.backend.location(),
            blocklist = initial.blocklist.len(),
            whitelist = initial.whitelist.len(),
            "Policy document created"
        );
        Ok(())
    }

    /// Load the document, writing `initial` first if none exists
    pub fn load_or_create(&self, initial: &PolicyDocument) -> StoreResult<PolicyDocument> {
        match self.load() {
            Err(StoreError::NotFound(_)) => {
                self.create(initial)?;
                Ok(initial.clone())
            }
            other => other,
        }
    }

    /// Prune expired entries, apply `patch` and persist the result.
    ///
    /// Entries the patch brings in already expired are pruned as well.
    pub fn merge(&self, patch: &PolicyPatch, now: i64) -> StoreResult<PolicyDocument> {
        let mut doc = self.load()?;
        let mut pruned = doc.prune_expired(now);
        apply_patch(&mut doc, patch);
        pruned += doc.prune_expired(now);
        if pruned > 0 {
            debug!(pruned, "Pruned expired entries");
        }

        self.write(&doc)?;
        Ok(doc)
    }

    fn write(&self, doc: &PolicyDocument) -> StoreResult<()> {
        let contents = serde_json::to_string_pretty(doc)?;
        self.backend.write(&contents)
    }
}

/// Parse a stored document; anything but a JSON object is corrupt
pub fn parse_document(contents: &str) -> StoreResult<PolicyDocument> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    if !value.is_object() {
        return Err(StoreError::Corrupt("root is not a JSON object".into()));
    }
    Ok(serde_json::from_value(value)?)
}

/// Apply a patch to a document in place.
///
/// Scalars overwrite. Lists are desired end-state sets compared by whole
/// entry, so entries sharing a name are independent.
pub fn apply_patch(doc: &mut PolicyDocument, patch: &PolicyPatch) {
    if let Some(blocklist) = &patch.blocklist {
        merge_list(&mut doc.blocklist, blocklist);
    }
    if let Some(whitelist) = &patch.whitelist {
        merge_list(&mut doc.whitelist, whitelist);
    }
    if let Some(shield) = patch.shield {
        doc.shield = shield;
    }
    if let Some(hash) = &patch.password_hash {
        doc.password_hash = Some(hash.clone());
    }
}

fn merge_list(stored: &mut Vec<DistractionEntry>, desired: &[DistractionEntry]) {
    // Stored entries keep their order (and duplicates) when still desired
    stored.retain(|e| desired.contains(e));

    for entry in desired {
        if !stored.contains(entry) {
            stored.push(entry.clone());
        }
    }
}
