//! Match evaluator: decides whether a name is blocked right now

use chrono::{DateTime, Local};
use tracing::warn;
use warden_api::{DistractionEntry, PolicyDocument, ANY_DOMAIN};
use warden_util::TimeSpec;

/// How an entry name matches candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    /// Exact app id or hostname
    Exact(String),
    /// `*.<suffix>`: the suffix itself and anything under it
    Subdomain(String),
    /// `*.*`: every dotted name
    AnyDomain,
}

impl NamePattern {
    pub fn parse(name: &str) -> Self {
        if name == ANY_DOMAIN {
            return NamePattern::AnyDomain;
        }
        match name.strip_prefix("*.") {
            Some(suffix) => NamePattern::Subdomain(suffix.to_string()),
            None => NamePattern::Exact(name.to_string()),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            NamePattern::Exact(name) => candidate == name,
            NamePattern::Subdomain(suffix) => {
                candidate == suffix
                    || candidate
                        .strip_suffix(suffix.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            NamePattern::AnyDomain => candidate.contains('.'),
        }
    }
}

/// When a blocklist rule applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Always,
    /// A daily interval spec, active per [`TimeSpec::is_active_at`]
    Window(TimeSpec),
}

impl Activation {
    fn from_entry(entry: &DistractionEntry) -> Self {
        match entry.time_spec() {
            None | Some(Ok(TimeSpec::Duration { .. })) => Activation::Always,
            Some(Ok(interval)) => Activation::Window(interval),
            Some(Err(e)) => {
                warn!(name = %entry.name, error = %e, "Unparseable time, treating entry as always active");
                Activation::Always
            }
        }
    }

    /// Windows are inactive when the local time is unknown
    pub fn is_active_at(&self, local: Option<&DateTime<Local>>) -> bool {
        match self {
            Activation::Always => true,
            Activation::Window(spec) => local.is_some_and(|dt| spec.is_active_at(dt)),
        }
    }
}

/// A compiled blocklist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: NamePattern,
    pub activation: Activation,
}

/// A policy document compiled for repeated evaluation
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    blocklist: Vec<Rule>,
    whitelist: Vec<NamePattern>,
}

impl Matcher {
    /// Compile `doc` as seen at `now`. Expired entries are left out.
    pub fn compile(doc: &PolicyDocument, now: i64) -> Self {
        let blocklist = doc
            .blocklist
            .iter()
            .filter(|e| !e.is_expired(now))
            .map(|e| Rule {
                pattern: NamePattern::parse(&e.name),
                activation: Activation::from_entry(e),
            })
            .collect();

        let whitelist = doc
            .whitelist
            .iter()
            .filter(|e| !e.is_expired(now))
            .map(|e| NamePattern::parse(&e.name))
            .collect();

        Self {
            blocklist,
            whitelist,
        }
    }

    /// Whitelist wins; otherwise any active matching blocklist rule blocks
    pub fn is_blocked(&self, candidate: &str, now: i64) -> bool {
        if self.whitelist.iter().any(|p| p.matches(candidate)) {
            return false;
        }

        let local = warden_util::local_datetime(now);
        self.blocklist
            .iter()
            .any(|rule| rule.pattern.matches(candidate) && rule.activation.is_active_at(local.as_ref()))
    }
}

/// Compile and evaluate in one go
pub fn is_blocked(doc: &PolicyDocument, candidate: &str, now: i64) -> bool {
    Matcher::compile(doc, now).is_blocked(candidate, now)
}
