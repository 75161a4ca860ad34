#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for authn sync integration tests

use std::sync::Arc;

use authn_sync::{AuthSpec, AuthnSyncConfig, AuthnSyncService};
use authn_sync_sdk::{AuthRuleMatch, BindingKind, JwtHeader, VersionNumber};
use in_memory_device_plugin::{Call, Client, InMemoryDeviceConfig, Service};

pub struct Harness {
    pub device: Arc<Service>,
    pub service: AuthnSyncService,
}

/// Harness against a device running `release` / `build` firmware.
pub fn harness_on(release: (u32, u32), build: (u32, u32)) -> Harness {
    harness_with(
        InMemoryDeviceConfig {
            release: VersionNumber::new(release.0, release.1),
            build: VersionNumber::new(build.0, build.1),
        },
        AuthnSyncConfig::default(),
    )
}

/// Harness against pattern-set capable firmware.
pub fn harness() -> Harness {
    harness_with(InMemoryDeviceConfig::default(), AuthnSyncConfig::default())
}

pub fn harness_with(device: InMemoryDeviceConfig, config: AuthnSyncConfig) -> Harness {
    let device = Arc::new(Service::new(&device));
    let client = Arc::new(Client::new(device.clone()));
    let service = AuthnSyncService::new(client.clone(), client, config);
    Harness { device, service }
}

pub const JWKS: &str = r#"{"keys":[{"kty":"RSA","kid":"k1","n":"AQAB","e":"AQAB"}]}"#;

/// A spec exercising every emitted object kind.
pub fn full_spec(name: &str) -> AuthSpec {
    AuthSpec {
        name: name.to_owned(),
        issuer: "https://issuer.example.com".to_owned(),
        jwks: JWKS.to_owned(),
        include_paths: vec![AuthRuleMatch::prefix("/api")],
        exclude_paths: vec![AuthRuleMatch::exact("/api/health")],
        audiences: vec!["orders".to_owned(), "billing".to_owned()],
        jwt_headers: vec![
            JwtHeader::with_prefix("Authorization", "Bearer "),
            JwtHeader::new("X-Token"),
            JwtHeader::new("X-Alt-Token"),
        ],
        jwt_params: vec!["access_token".to_owned()],
        ..AuthSpec::default()
    }
}

pub fn removals(calls: &[Call]) -> Vec<Call> {
    calls.iter().filter(|c| c.kind.is_removal()).cloned().collect()
}

pub fn bound_targets(device: &Service, kind: BindingKind, owner: &str) -> Vec<String> {
    device
        .bindings(kind, owner)
        .into_iter()
        .map(|b| b.target)
        .collect()
}
