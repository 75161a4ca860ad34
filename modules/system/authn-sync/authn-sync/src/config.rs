//! Configuration for the authn sync module.

use std::path::Path;

use authn_sync_sdk::VersionNumber;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;

use crate::domain::capability::{AudienceMode, CapabilityRule};

pub use authn_sync_sdk::ClientSecret;

/// Prefix of environment variables overriding file configuration.
pub const ENV_PREFIX: &str = "AUTHN_SYNC_";

/// Configuration error.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid authn sync config: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Authn sync module configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthnSyncConfig {
    /// Directory on the device holding uploaded key material, with trailing slash.
    pub cert_dir: String,
    /// Length budget of the single-field audience on legacy firmware.
    pub audience_budget: usize,
    /// Upper bound for content-addressed key material names.
    pub content_name_max_len: usize,
    /// Appended to a cs vserver name to derive its auth vserver name.
    pub vserver_suffix: String,
    /// Endpoint placed in the mandatory but unused action endpoint fields.
    pub placeholder_endpoint: String,
    /// Client id placed in the mandatory but unused action credential field.
    pub client_id: String,
    /// Client secret placed in the mandatory but unused action credential field.
    pub client_secret: ClientSecret,
    /// Firmware capability table, evaluated in order; first match wins.
    pub capability_rules: Vec<CapabilityRule>,
}

impl Default for AuthnSyncConfig {
    fn default() -> Self {
        Self {
            cert_dir: "/nsconfig/ssl/".to_owned(),
            audience_budget: 127,
            content_name_max_len: 127,
            vserver_suffix: "authn".to_owned(),
            placeholder_endpoint: "https://dummy.com".to_owned(),
            client_id: "testcitrix".to_owned(),
            client_secret: ClientSecret::new("testcitrix"),
            capability_rules: default_capability_rules(),
        }
    }
}

impl AuthnSyncConfig {
    /// Extract the configuration from a prepared figment.
    ///
    /// Missing keys fall back to [`AuthnSyncConfig::default`].
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] on unknown keys or mistyped values.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Load defaults, then an optional YAML file, then `AUTHN_SYNC_*` variables.
    ///
    /// Nested keys in variables are separated by a double underscore.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if any layer cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }
}

/// Firmware thresholds at which audience handling changes.
#[must_use]
pub fn default_capability_rules() -> Vec<CapabilityRule> {
    vec![
        CapabilityRule {
            release: VersionNumber::new(13, 0),
            min_build: VersionNumber::new(41, 10),
            audience_mode: AudienceMode::PatternSet,
        },
        CapabilityRule {
            release: VersionNumber::new(13, 0),
            min_build: VersionNumber::new(38, 15),
            audience_mode: AudienceMode::LegacyMulti,
        },
        CapabilityRule {
            release: VersionNumber::new(12, 1),
            min_build: VersionNumber::new(53, 3),
            audience_mode: AudienceMode::LegacyMulti,
        },
    ]
}
