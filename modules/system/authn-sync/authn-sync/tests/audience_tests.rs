#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for audience handling across firmware generations

mod common;

use authn_sync::{AuthSpec, DomainError};
use authn_sync_sdk::{BindingKind, DeviceVersion, Resource, ResourceKind, VersionNumber};
use common::{bound_targets, full_spec, harness, harness_on};

fn action_audience(h: &common::Harness, name: &str) -> Option<String> {
    match h.device.resource(ResourceKind::OAuthAction, name) {
        Some(Resource::OAuthAction(action)) => action.audience,
        other => panic!("unexpected action {other:?}"),
    }
}

fn with_audiences(audiences: &[&str]) -> AuthSpec {
    AuthSpec {
        audiences: audiences.iter().map(|a| (*a).to_owned()).collect(),
        ..full_spec("vs")
    }
}

// =============================================================================
// Pattern set firmware
// =============================================================================

#[tokio::test]
async fn test_pattern_set_holds_one_entry_per_audience() {
    let h = harness();
    let long_a = "A".repeat(100);
    let long_b = "B".repeat(50);

    let report = h
        .service
        .sync(&with_audiences(&[&long_a, &long_b]))
        .await
        .unwrap();

    assert!(report.is_clean(), "faults: {:?}", report.faults);
    assert_eq!(action_audience(&h, "vs_10").as_deref(), Some("vs"));
    assert_eq!(
        bound_targets(&h.device, BindingKind::PatternSetEntry, "vs"),
        vec![long_a, long_b]
    );
}

#[tokio::test]
async fn test_pattern_set_entries_follow_the_spec() {
    let h = harness();
    h.service
        .sync(&with_audiences(&["orders", "billing"]))
        .await
        .unwrap();

    let report = h
        .service
        .sync(&with_audiences(&["billing", "shipping"]))
        .await
        .unwrap();

    assert!(report.is_clean(), "faults: {:?}", report.faults);
    let mut entries = bound_targets(&h.device, BindingKind::PatternSetEntry, "vs");
    entries.sort();
    assert_eq!(entries, vec!["billing", "shipping"]);
}

#[tokio::test]
async fn test_clearing_audiences_drops_the_pattern_set() {
    let h = harness();
    h.service
        .sync(&with_audiences(&["orders"]))
        .await
        .unwrap();

    let report = h.service.sync(&with_audiences(&[])).await.unwrap();

    assert!(report.is_clean(), "faults: {:?}", report.faults);
    assert_eq!(action_audience(&h, "vs_10"), None);
    assert!(h.device.resource(ResourceKind::PatternSet, "vs").is_none());
}

// =============================================================================
// Legacy firmware
// =============================================================================

#[tokio::test]
async fn test_legacy_multi_value_drops_what_does_not_fit() {
    let h = harness_on((12, 1), (53, 3));
    let long_a = "A".repeat(100);
    let long_b = "B".repeat(50);

    let report = h
        .service
        .sync(&with_audiences(&[&long_a, &long_b, "c"]))
        .await
        .unwrap();

    assert!(report.is_clean(), "faults: {:?}", report.faults);
    assert_eq!(action_audience(&h, "vs_10"), Some(long_a));
    assert!(h.device.resource(ResourceKind::PatternSet, "vs").is_none());
}

#[tokio::test]
async fn test_legacy_multi_value_joins_with_commas() {
    let h = harness_on((13, 0), (38, 15));

    h.service
        .sync(&with_audiences(&["orders", "billing"]))
        .await
        .unwrap();

    assert_eq!(
        action_audience(&h, "vs_10").as_deref(),
        Some("orders,billing")
    );
}

#[tokio::test]
async fn test_oldest_firmware_keeps_only_the_first_audience() {
    let h = harness_on((12, 0), (60, 1));

    h.service
        .sync(&with_audiences(&["orders", "billing"]))
        .await
        .unwrap();

    assert_eq!(action_audience(&h, "vs_10").as_deref(), Some("orders"));
}

#[tokio::test]
async fn test_legacy_rejects_commas_before_touching_the_device() {
    let h = harness_on((12, 1), (53, 3));

    let err = h
        .service
        .sync(&with_audiences(&["a,b"]))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::AudiencePacking { .. }));
    assert_eq!(h.device.resource_count(), 0);
}

// =============================================================================
// Firmware changes between passes
// =============================================================================

#[tokio::test]
async fn test_upgrade_moves_audiences_into_a_pattern_set() {
    let h = harness_on((13, 0), (38, 15));
    h.service
        .sync(&with_audiences(&["orders", "billing"]))
        .await
        .unwrap();

    h.device.set_version(DeviceVersion::new(
        VersionNumber::new(13, 0),
        VersionNumber::new(41, 10),
    ));
    let report = h
        .service
        .sync(&with_audiences(&["orders", "billing"]))
        .await
        .unwrap();

    assert!(report.is_clean(), "faults: {:?}", report.faults);
    assert_eq!(action_audience(&h, "vs_10").as_deref(), Some("vs"));
    assert_eq!(
        bound_targets(&h.device, BindingKind::PatternSetEntry, "vs").len(),
        2
    );
}

#[tokio::test]
async fn test_downgrade_drops_the_pattern_set() {
    let h = harness();
    h.service
        .sync(&with_audiences(&["orders", "billing"]))
        .await
        .unwrap();

    h.device.set_version(DeviceVersion::new(
        VersionNumber::new(13, 0),
        VersionNumber::new(38, 15),
    ));
    let report = h
        .service
        .sync(&with_audiences(&["orders", "billing"]))
        .await
        .unwrap();

    assert!(report.is_clean(), "faults: {:?}", report.faults);
    assert_eq!(
        action_audience(&h, "vs_10").as_deref(),
        Some("orders,billing")
    );
    assert!(h.device.resource(ResourceKind::PatternSet, "vs").is_none());
}
