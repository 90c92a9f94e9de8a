//! Block decision tracking for enforcement

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::Matcher;

/// A name whose block decision flipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionChange {
    pub name: String,
    pub blocked: bool,
}

/// Remembers the last decision per observed name and reports flips.
///
/// Unknown names count as not blocked, so a name first seen unblocked is
/// not reported. A blocked name that stops being observed is reported as
/// released and forgotten.
#[derive(Debug, Default)]
pub struct DecisionTracker {
    decisions: BTreeMap<String, bool>,
}

impl DecisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<I, S>(&mut self, observed: I, matcher: &Matcher, now: i64) -> Vec<DecisionChange>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let observed: BTreeSet<String> = observed.into_iter().map(Into::into).collect();
        let mut changes = Vec::new();

        for name in &observed {
            let blocked = matcher.is_blocked(name, now);
            let previous = self.decisions.insert(name.clone(), blocked).unwrap_or(false);
            if previous != blocked {
                changes.push(DecisionChange {
                    name: name.clone(),
                    blocked,
                });
            }
        }

        let vanished: Vec<String> = self
            .decisions
            .keys()
            .filter(|name| !observed.contains(*name))
            .cloned()
            .collect();
        for name in vanished {
            if self.decisions.remove(&name) == Some(true) {
                changes.push(DecisionChange { name, blocked: false });
            }
        }

        if !changes.is_empty() {
            debug!(changes = changes.len(), tracked = self.decisions.len(), "Block decisions changed");
        }
        changes
    }

    /// Names currently considered blocked
    pub fn blocked(&self) -> impl Iterator<Item = &str> {
        self.decisions
            .iter()
            .filter(|(_, blocked)| **blocked)
            .map(|(name, _)| name.as_str())
    }
}
