//! Policy document types

use serde::{Deserialize, Serialize};
use std::fmt;
use warden_util::{TimeSpec, TimeSpecError};

/// The universal wildcard: every domain-shaped name
pub const ANY_DOMAIN: &str = "*.*";

/// A single blocklist or whitelist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractionEntry {
    /// Exact app/host name, `*.<domain>`, or `*.*`
    pub name: String,

    /// Duration (`1h30m`) or daily interval (`9h-17h`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Absolute expiry in epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
}

impl DistractionEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: None,
            timeout: None,
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_timeout(mut self, timeout: i64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Expired entries are inert and get pruned on the next write
    pub fn is_expired(&self, now: i64) -> bool {
        self.timeout.is_some_and(|timeout| timeout <= now)
    }

    /// Classify the attached time spec, if any
    pub fn time_spec(&self) -> Option<Result<TimeSpec, TimeSpecError>> {
        self.time.as_deref().map(warden_util::classify)
    }
}

/// The persisted policy document.
///
/// Serialized with camelCase keys: `blocklist`, `whitelist`, `shield`,
/// `passwordHash`. Missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyDocument {
    pub blocklist: Vec<DistractionEntry>,
    pub whitelist: Vec<DistractionEntry>,
    pub shield: bool,
    /// Hex digest of the shield password; `None` until one is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl PolicyDocument {
    /// Remove expired entries in place. Returns how many were dropped.
    pub fn prune_expired(&mut self, now: i64) -> usize {
        let before = self.blocklist.len() + self.whitelist.len();
        self.blocklist.retain(|e| !e.is_expired(now));
        self.whitelist.retain(|e| !e.is_expired(now));
        before - self.blocklist.len() - self.whitelist.len()
    }

    /// Copy of this document without expired entries
    pub fn pruned(&self, now: i64) -> Self {
        let mut doc = self.clone();
        doc.prune_expired(now);
        doc
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }

    pub fn blocklist_names(&self) -> impl Iterator<Item = &str> {
        self.blocklist.iter().map(|e| e.name.as_str())
    }

    pub fn whitelist_names(&self) -> impl Iterator<Item = &str> {
        self.whitelist.iter().map(|e| e.name.as_str())
    }
}

/// A partial edit of the policy document.
///
/// Present scalar fields overwrite; present lists describe the desired end
/// state of that list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocklist: Option<Vec<DistractionEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<DistractionEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shield: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl PolicyPatch {
    pub fn blocklist(entries: Vec<DistractionEntry>) -> Self {
        Self {
            blocklist: Some(entries),
            ..Default::default()
        }
    }

    pub fn whitelist(entries: Vec<DistractionEntry>) -> Self {
        Self {
            whitelist: Some(entries),
            ..Default::default()
        }
    }

    pub fn shield(enabled: bool) -> Self {
        Self {
            shield: Some(enabled),
            ..Default::default()
        }
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocklist.is_none()
            && self.whitelist.is_none()
            && self.shield.is_none()
            && self.password_hash.is_none()
    }
}

/// A patch field the shield refused to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectedField {
    Shield,
    PasswordHash,
    BlocklistRemoval,
    WhitelistAddition,
}

impl fmt::Display for RejectedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectedField::Shield => "disabling shield",
            RejectedField::PasswordHash => "changing the shield password",
            RejectedField::BlocklistRemoval => "removing or changing blocklist entries",
            RejectedField::WhitelistAddition => "adding whitelist entries",
        };
        f.write_str(s)
    }
}

/// Client-facing view of the policy; never exposes the password hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyView {
    pub blocklist: Vec<DistractionEntry>,
    pub whitelist: Vec<DistractionEntry>,
    pub shield: bool,
    pub has_password: bool,
}

impl From<&PolicyDocument> for PolicyView {
    fn from(doc: &PolicyDocument) -> Self {
        Self {
            blocklist: doc.blocklist.clone(),
            whitelist: doc.whitelist.clone(),
            shield: doc.shield,
            has_password: doc.has_password(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_uses_camel_case_keys() {
        let doc = PolicyDocument {
            blocklist: vec![DistractionEntry::new("example.com").with_time("10h-18h")],
            whitelist: vec![],
            shield: true,
            password_hash: Some("abc".into()),
        };

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["passwordHash"], "abc");
        assert_eq!(json["shield"], true);
        assert_eq!(json["blocklist"][0]["name"], "example.com");
        assert_eq!(json["blocklist"][0]["time"], "10h-18h");
        assert!(json["blocklist"][0].get("timeout").is_none());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let doc: PolicyDocument = serde_json::from_str(r#"{"blocklist":[{"name":"x.com"}]}"#).unwrap();
        assert_eq!(doc.blocklist.len(), 1);
        assert!(doc.whitelist.is_empty());
        assert!(!doc.shield);
        assert!(!doc.has_password());
    }

    #[test]
    fn wrong_shape_is_rejected() {
        assert!(serde_json::from_str::<PolicyDocument>(r#"{"blocklist":"x.com"}"#).is_err());
        assert!(serde_json::from_str::<PolicyDocument>("[]").is_err());
    }

    #[test]
    fn prune_drops_only_expired() {
        let mut doc = PolicyDocument {
            blocklist: vec![
                DistractionEntry::new("old.com").with_timeout(100),
                DistractionEntry::new("edge.com").with_timeout(200),
                DistractionEntry::new("new.com").with_timeout(300),
                DistractionEntry::new("forever.com"),
            ],
            ..Default::default()
        };

        assert_eq!(doc.prune_expired(200), 2);
        let names: Vec<_> = doc.blocklist_names().collect();
        assert_eq!(names, vec!["new.com", "forever.com"]);
    }

    #[test]
    fn view_hides_password_hash() {
        let doc = PolicyDocument {
            password_hash: Some("deadbeef".into()),
            ..Default::default()
        };
        let view = PolicyView::from(&doc);
        assert!(view.has_password);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("deadbeef"));
    }

    #[test]
    fn empty_patch() {
        assert!(PolicyPatch::default().is_empty());
        assert!(!PolicyPatch::shield(true).is_empty());
        let json = serde_json::to_string(&PolicyPatch::blocklist(vec![])).unwrap();
        assert_eq!(json, r#"{"blocklist":[]}"#);
    }
}
