//! Authn Sync Module
//!
//! Turns a declarative [`AuthSpec`] into the authentication objects of an
//! application delivery controller and keeps them converged across updates.
//!
//! A pass validates an [`AuthSpec`], resolves what the device firmware supports,
//! creates or updates the auth vserver, key material, validation action,
//! policies and login schemas, and finally removes entries left behind by
//! earlier versions of the same auth spec. Device failures are collected, not raised.
//!
//! ## Configuration
//!
//! ```yaml
//! cert_dir: "/nsconfig/ssl/"
//! audience_budget: 127
//! vserver_suffix: "authn"
//! capability_rules:
//!   - release: "13.0"
//!     min_build: "41.10"
//!     audience_mode: pattern_set
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub use authn_sync_sdk::{AuthSpec, ContentStore, DeviceSession, SessionError};

pub mod config;
pub mod domain;

pub use config::{AuthnSyncConfig, ClientSecret, ConfigError};
pub use domain::error::DomainError;
pub use domain::faults::Fault;
pub use domain::service::{AuthnSyncService, SyncReport};
