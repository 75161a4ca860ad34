//! Authn Sync SDK
//!
//! This crate provides the public contract of the `authn_sync` module:
//!
//! - [`DeviceSession`] - Plugin API trait for the remote configuration store
//! - [`ContentStore`] - Plugin API trait for content-addressed key material
//! - [`AuthSpec`], [`Resource`], [`Binding`] - Domain models
//! - [`SessionError`] - Error type returned by plugin implementations
//! - [`ClientSecret`] - Zeroizing wrapper for the OAuth client secret
//!
//! ## Usage
//!
//! The engine receives both capabilities as trait objects:
//!
//! ```ignore
//! use authn_sync_sdk::{ContentStore, DeviceSession};
//!
//! let session: Arc<dyn DeviceSession> = Arc::new(NitroSession::connect(&cfg).await?);
//! let content: Arc<dyn ContentStore> = session.clone();
//! let service = AuthnSyncService::new(session, content, config);
//! let report = service.sync(&spec).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod error;
pub mod models;
pub mod plugin_api;
pub mod secret;

pub use error::{SessionError, VersionParseError, messages};
pub use models::{
    AuthRuleMatch, AuthSpec, AuthVserver, Binding, BindingKind, CsVserverAuth, DeviceVersion,
    Field, FrontendTls, JwtHeader, LoginSchema, OAuthAction, PathMatch, PatternSet, Policy,
    Resource, ResourceKind, VersionNumber,
};
pub use plugin_api::{ContentStore, DeviceSession};
pub use secret::ClientSecret;
