//! Architectural Contract Test: Idempotency
//!
//! Constraints verified:
//! - A second run over unchanged addresses writes nothing
//! - Remote values are compared by address, not by text
//! - Replacing a record keeps its TTL
//! - No notification is sent when nothing changed
//!
//! If this test fails, every scheduled run would rewrite remote state.

mod common;

use common::*;
use v6sync_core::SyncConfig;
use v6sync_core::traits::RecordType;

#[tokio::test]
async fn second_run_changes_nothing() {
    let harness = Harness::new();
    harness.firewall.add_group("web-v6", &["2001:db8:1:100::1"]);
    harness.cluster.add_service("ingress", "nginx", &[]);
    harness
        .cluster
        .add_pool("metallb-system", "public", &["192.0.2.240-192.0.2.250"]);
    let reconciler = harness.reconciler(Some("192.0.2.7"), Some("2001:db8:1:203::9"));
    let config = full_config();

    let first = reconciler.run(&config).await.expect("first run completes");
    assert!(first.has_changes());
    let writes_after_first = harness.log.writes().len();

    let second = reconciler.run(&config).await.expect("second run completes");

    assert!(
        !second.has_changes(),
        "second run changed: {:?}",
        second.changes()
    );
    assert!(second.is_clean());
    assert_eq!(
        harness.log.writes().len(),
        writes_after_first,
        "no writes on the second run"
    );
    assert_eq!(
        harness.notifier.messages().len(),
        1,
        "only the first run notifies"
    );
}

#[tokio::test]
async fn non_canonical_remote_values_count_as_equal() {
    let harness = Harness::new();
    harness.zone.insert(
        "example.com.",
        RecordType::Aaaa,
        300,
        "2001:0DB8:0001:0200:0000:0000:0000:0001",
    );
    harness
        .firewall
        .add_group("web-v6", &["2001:db8:1:200:0:0:0:1"]);

    let config = SyncConfig::new()
        .with_ipv6_domain("example.com", "::1")
        .with_firewall_group("example.com", "web-v6");

    let report = harness
        .reconciler(None, Some("2001:db8:1:2ff::1"))
        .run(&config)
        .await
        .expect("run completes");

    assert!(!report.has_changes(), "changes: {:?}", report.changes());
    assert!(harness.log.writes().is_empty());
}

#[tokio::test]
async fn replace_keeps_existing_ttl() {
    let harness = Harness::new();
    harness
        .zone
        .insert("example.com.", RecordType::Aaaa, 60, "2001:db8:9::1");
    harness
        .zone
        .insert("home.example.com.", RecordType::A, 120, "198.51.100.1");

    let config = SyncConfig::new()
        .with_ipv4_domain("home.example.com")
        .with_ipv6_domain("example.com", "::1");

    let report = harness
        .reconciler(Some("192.0.2.7"), Some("2001:db8::abcd"))
        .run(&config)
        .await
        .expect("run completes");

    let aaaa = harness.zone.record("example.com.", RecordType::Aaaa).unwrap();
    assert_eq!(aaaa.ttl, 60);
    assert_eq!(aaaa.rrdatas, vec!["2001:db8::1"]);

    let a = harness.zone.record("home.example.com.", RecordType::A).unwrap();
    assert_eq!(a.ttl, 120);
    assert_eq!(a.rrdatas, vec!["192.0.2.7"]);

    assert_eq!(report.changes().len(), 2);
    assert!(report.changes().iter().all(|c| c.contains("updated")));
}

#[tokio::test]
async fn multi_member_group_is_collapsed_to_one() {
    let harness = Harness::new();
    harness
        .firewall
        .add_group("web-v6", &["2001:db8::1", "2001:db8::dead"]);

    let config = SyncConfig::new()
        .with_ipv6_domain("example.com", "::1")
        .with_firewall_group("example.com", "web-v6");

    let report = harness
        .reconciler(None, Some("2001:db8::abcd"))
        .run(&config)
        .await
        .expect("run completes");

    assert_eq!(harness.firewall.members("web-v6").unwrap(), vec!["2001:db8::1"]);
    assert!(
        report
            .changes()
            .iter()
            .any(|c| c.starts_with("[firewall] group 'web-v6'"))
    );
}
