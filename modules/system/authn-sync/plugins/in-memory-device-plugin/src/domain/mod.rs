//! Domain layer for the in-memory device plugin.

pub mod client;
pub mod service;

pub use client::Client;
pub use service::{Call, CallKind, Service};
