//! Architectural Contract Test: Detection Phases and Fatal Configuration
//!
//! Constraints verified:
//! - A failed IPv4 detection skips the IPv4 phase only, and vice versa
//! - Detection output that is not an address counts as a detection failure
//! - Missing configuration or collaborators abort before any remote call
//! - Phases with no targets do not detect at all
//!
//! If this test fails, the failure scopes of a run are wrong.

mod common;

use common::*;
use v6sync_core::traits::RecordType;
use v6sync_core::{Error, Reconciler, SyncConfig};

fn mixed_config() -> SyncConfig {
    SyncConfig::new()
        .with_ipv4_domain("home.example.com")
        .with_ipv6_domain("example.com", "::1")
}

#[tokio::test]
async fn ipv4_detection_failure_skips_ipv4_phase_only() {
    let harness = Harness::new();

    let report = harness
        .reconciler(None, Some("2001:db8::abcd"))
        .run(&mixed_config())
        .await
        .expect("run completes");

    assert!(harness.zone.record("home.example.com.", RecordType::A).is_none());
    assert!(harness.zone.record("example.com.", RecordType::Aaaa).is_some());
    assert_eq!(report.failures().len(), 1);
    assert!(report.failures()[0].starts_with("[ipv4] skipping IPv4 phase"));
}

#[tokio::test]
async fn ipv6_detection_failure_skips_ipv6_phase_only() {
    let harness = Harness::new();
    harness.cluster.add_pool("metallb-system", "public", &[]);
    let config = mixed_config().with_pool(v6sync_core::PoolTarget::new(
        "metallb-system",
        "public",
        "::100",
    ));

    let report = harness
        .reconciler(Some("192.0.2.7"), None)
        .run(&config)
        .await
        .expect("run completes");

    assert!(harness.zone.record("home.example.com.", RecordType::A).is_some());
    let calls = harness.log.calls();
    assert!(!calls.iter().any(|c| c.contains("AAAA") || c.contains("pool")));
    assert_eq!(report.failures().len(), 1);
    assert!(report.failures()[0].starts_with("[ipv6] skipping IPv6 phase"));
}

#[tokio::test]
async fn garbage_detection_output_is_a_detection_failure() {
    let harness = Harness::new();

    let report = harness
        .reconciler(Some("<html>rate limited</html>"), Some("not-an-address"))
        .run(&mixed_config())
        .await
        .expect("run completes");

    assert!(harness.log.writes().is_empty());
    assert_eq!(report.failures().len(), 2);
    assert!(report.failures()[0].starts_with("[ipv4]"));
    assert!(report.failures()[1].starts_with("[ipv6]"));
    assert!(!report.has_changes());
}

#[tokio::test]
async fn detected_text_is_trimmed() {
    let harness = Harness::new();

    let report = harness
        .reconciler(Some("192.0.2.7\n"), Some(" 2001:db8::abcd\n"))
        .run(&mixed_config())
        .await
        .expect("run completes");

    assert!(report.is_clean(), "failures: {:?}", report.failures());
    assert_eq!(report.changes().len(), 2);
}

#[tokio::test]
async fn empty_configuration_is_fatal_and_silent() {
    let harness = Harness::new();

    let err = harness
        .reconciler(Some("192.0.2.7"), Some("2001:db8::abcd"))
        .run(&SyncConfig::new())
        .await
        .expect_err("nothing to do is a configuration error");

    assert!(matches!(err, Error::ConfigMissing(_)));
    assert!(err.is_fatal());
    assert!(harness.log.calls().is_empty(), "no collaborator was called");
    assert!(harness.notifier.messages().is_empty());
}

#[tokio::test]
async fn missing_collaborator_is_fatal() {
    let log = CallLog::default();
    let notifier = RecordingNotifier::default();
    let reconciler = Reconciler::new(
        Box::new(StaticIpSource::new(None, Some("2001:db8::abcd"), &log)),
        Box::new(notifier.clone()),
    )
    .with_dns(Box::new(MemoryZone::new(&log)));

    let config = SyncConfig::new()
        .with_ipv6_domain("example.com", "::1")
        .with_firewall_group("example.com", "web-v6");

    let err = reconciler
        .run(&config)
        .await
        .expect_err("firewall targets need a controller");

    assert!(matches!(err, Error::ConfigMissing(_)));
    assert!(log.calls().is_empty());
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn zero_ttl_is_rejected() {
    let harness = Harness::new();
    let mut config = mixed_config();
    config.default_ttl = 0;

    let err = harness
        .reconciler(Some("192.0.2.7"), Some("2001:db8::abcd"))
        .run(&config)
        .await
        .expect_err("ttl 0 is invalid");

    assert!(matches!(err, Error::Config(_)));
    assert!(harness.log.calls().is_empty());
}

#[tokio::test]
async fn ipv4_only_configuration_never_detects_ipv6() {
    let harness = Harness::new();
    let config = SyncConfig::new().with_ipv4_domain("home.example.com");

    harness
        .reconciler(Some("192.0.2.7"), None)
        .run(&config)
        .await
        .expect("run completes");

    assert!(!harness.log.calls().iter().any(|c| c == "detect IPv6"));
}
