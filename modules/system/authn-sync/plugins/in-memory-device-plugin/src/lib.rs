//! In-memory device plugin for authn sync.
//!
//! Keeps the configuration of a simulated gateway device in process memory
//! and enforces the referential rules a real device applies: bound policies,
//! referenced actions, schemas, pattern sets and files cannot be deleted.
//! Every call is journaled and failures can be injected per call, which
//! makes the plugin suitable for tests and dry runs.
//!
//! ## Configuration
//!
//! ```yaml
//! release: "13.0"
//! build: "41.10"
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;


pub use config::InMemoryDeviceConfig;
pub use domain::{Call, CallKind, Client, Service};
