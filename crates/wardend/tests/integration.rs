//! Integration tests for wardend
//!
//! These tests verify the end-to-end behavior of the policy pipeline:
//! validator, shield guard, store, evaluator and decision tracking.

use chrono::{Local, TimeZone};
use std::sync::Arc;
use warden_api::{DistractionEntry, PolicyDocument, PolicyPatch, RejectedField};
use warden_core::{DecisionTracker, PolicyEngine};
use warden_host_api::{AppCatalog, Enforcer, MockCatalog, MockEnforcer};
use warden_store::{MemoryBackend, PolicyStore};

const NOW: i64 = 1_704_063_600;

fn at_hour(hour: u32) -> i64 {
    Local
        .with_ymd_and_hms(2025, 6, 18, hour, 0, 0)
        .single()
        .unwrap()
        .timestamp()
}

fn make_engine(doc: PolicyDocument, catalog: Arc<MockCatalog>) -> PolicyEngine<Arc<MemoryBackend>> {
    let store = PolicyStore::new(Arc::new(MemoryBackend::new()));
    store.create(&doc).unwrap();
    PolicyEngine::new(store, catalog)
}

#[test]
fn test_resolve_timeout_property() {
    assert_eq!(warden_util::resolve_timeout("1h59m", 1_704_063_600).unwrap(), 1_704_070_740);
    for (spec, seconds) in [("30m", 1800), ("1d", 86_400), ("2h", 7200), ("1d1h1m", 90_060)] {
        assert_eq!(warden_util::resolve_timeout(spec, NOW).unwrap(), NOW + seconds);
    }
}

#[test]
fn test_every_hour_pair_is_an_interval() {
    for start in 0..24 {
        for end in 0..24 {
            let spec = format!("{}h-{}h", start, end);
            assert!(warden_util::classify(&spec).unwrap().is_interval(), "{}", spec);
        }
    }
}

#[test]
fn test_whitelist_exception_under_universal_block() {
    let catalog = Arc::new(MockCatalog::with_apps(["chromium"]));
    let engine = make_engine(
        PolicyDocument {
            blocklist: vec![DistractionEntry::new("*.*")],
            whitelist: vec![DistractionEntry::new("www.example.com")],
            ..Default::default()
        },
        catalog,
    );

    assert!(!engine.is_blocked("www.example.com", NOW).unwrap());
    assert!(engine.is_blocked("other.com", NOW).unwrap());
    assert!(!engine.is_blocked("chromium", NOW).unwrap());
}

#[test]
fn test_empty_blocklist_merge_is_idempotent() {
    let engine = make_engine(
        PolicyDocument {
            blocklist: vec![DistractionEntry::new("example.com")],
            ..Default::default()
        },
        Arc::new(MockCatalog::new()),
    );

    let first = engine.merge(&PolicyPatch::blocklist(vec![]), None, NOW).unwrap();
    let second = engine.merge(&PolicyPatch::blocklist(vec![]), None, NOW).unwrap();
    assert!(first.document.blocklist.is_empty());
    assert_eq!(first.document, second.document);
}

#[test]
fn test_shield_requires_password_to_clear_blocklist() {
    let engine = make_engine(
        PolicyDocument {
            blocklist: vec![DistractionEntry::new("example.com")],
            ..Default::default()
        },
        Arc::new(MockCatalog::new()),
    );
    engine.enable_shield("hunter2", NOW).unwrap();

    let outcome = engine.merge(&PolicyPatch::blocklist(vec![]), None, NOW).unwrap();
    assert_eq!(outcome.document.blocklist.len(), 1);
    assert!(outcome.rejected.contains(&RejectedField::BlocklistRemoval));

    let outcome = engine
        .merge(&PolicyPatch::blocklist(vec![]), Some("hunter2"), NOW)
        .unwrap();
    assert!(outcome.document.blocklist.is_empty());
    assert!(outcome.fully_applied());
}

#[test]
fn test_expired_entries_vanish_after_any_merge() {
    let catalog = Arc::new(MockCatalog::with_apps(["steam"]));
    let engine = make_engine(PolicyDocument::default(), catalog);

    engine.block("steam", Some("1h"), NOW).unwrap();
    engine.block("example.com", None, NOW).unwrap();

    let later = NOW + 3600;
    let outcome = engine.allow("docs.rs", None, later).unwrap();
    let names: Vec<_> = outcome.document.blocklist_names().collect();
    assert_eq!(names, vec!["example.com"]);
}

#[test]
fn test_interval_block_covers_window() {
    let engine = make_engine(
        PolicyDocument {
            blocklist: vec![DistractionEntry::new("example.com").with_time("0h-23h")],
            ..Default::default()
        },
        Arc::new(MockCatalog::new()),
    );

    for hour in 0..23 {
        assert!(engine.is_blocked("example.com", at_hour(hour)).unwrap(), "hour {}", hour);
    }
}

#[test]
fn test_decisions_reach_the_enforcer() {
    let catalog = Arc::new(MockCatalog::with_apps(["steam", "firefox"]));
    catalog.start("steam");
    catalog.start("firefox");

    let engine = make_engine(PolicyDocument::default(), catalog.clone());
    let enforcer = MockEnforcer::new();
    let mut tracker = DecisionTracker::new();

    let mut run_tick = |engine: &PolicyEngine<Arc<MemoryBackend>>, now: i64| {
        let matcher = engine.matcher(now).unwrap();
        let running = catalog.running_apps().unwrap();
        for change in tracker.update(running, &matcher, now) {
            enforcer
                .on_block_decision_changed(&change.name, change.blocked)
                .unwrap();
        }
    };

    run_tick(&engine, NOW);
    assert!(enforcer.calls().is_empty());

    engine.block("steam", Some("30m"), NOW).unwrap();
    run_tick(&engine, NOW);
    assert_eq!(enforcer.calls(), vec![("steam".to_string(), true)]);

    // Timeout passes: the block lapses without any further write
    enforcer.clear();
    run_tick(&engine, NOW + 30 * 60);
    assert_eq!(enforcer.calls(), vec![("steam".to_string(), false)]);
}

#[test]
fn test_unknown_app_rejected_without_write() {
    let backend = Arc::new(MemoryBackend::new());
    let store = PolicyStore::new(backend.clone());
    store.create(&PolicyDocument::default()).unwrap();
    let before = backend.contents();

    let engine = PolicyEngine::new(store, Arc::new(MockCatalog::with_apps(["chromium"])));
    assert!(engine.block("steam", None, NOW).is_err());
    assert_eq!(backend.contents(), before);
}

#[test]
fn test_first_run_seeds_policy_from_config() {
    let settings = warden_config::parse_config(
        r#"
            config_version = 1

            [initial_policy]
            blocklist = [{ name = "*.reddit.com", time = "9h-17h" }]
            whitelist = [{ name = "docs.rs" }]
        "#,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warden/policy.json");
    let store = PolicyStore::new(warden_store::JsonFileBackend::new(&path));
    let doc = store.load_or_create(&settings.initial_policy).unwrap();
    assert_eq!(doc.blocklist.len(), 1);
    assert!(path.exists());

    let engine = PolicyEngine::new(store, Arc::new(MockCatalog::new()));
    assert!(engine.is_blocked("old.reddit.com", at_hour(10)).unwrap());
    assert!(!engine.is_blocked("old.reddit.com", at_hour(18)).unwrap());
    assert!(!engine.is_blocked("docs.rs", at_hour(10)).unwrap());
}
