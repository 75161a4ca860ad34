//! Domain errors for authn sync.
//!
//! These are raised before any mutating call reaches the device. Failures of
//! individual device calls are not errors at this level; they are collected
//! as [`Fault`](super::faults::Fault)s.

use authn_sync_sdk::SessionError;
use thiserror::Error;

/// Which path list a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleList {
    Include,
    Exclude,
}

impl std::fmt::Display for RuleList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Include => "include_paths",
            Self::Exclude => "exclude_paths",
        })
    }
}

/// Domain-level errors for authn sync operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// A path match rule cannot be rendered.
    #[error("invalid rule {list}[{index}]: {message}")]
    InvalidRule {
        list: RuleList,
        index: usize,
        message: String,
    },

    /// The spec is otherwise unusable.
    #[error("invalid auth spec: {field}: {message}")]
    InvalidSpec { field: String, message: String },

    /// The audiences cannot be expressed under the device's audience mode.
    #[error("audience packing failed: {message}")]
    AudiencePacking { message: String },

    /// Configuration does not allow the operation.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The device version could not be determined.
    #[error("device capability query failed: {0}")]
    Capability(#[from] SessionError),
}

impl DomainError {
    #[must_use]
    pub fn invalid_rule(list: RuleList, index: usize, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            list,
            index,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_spec(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            field: field.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn audience_packing(message: impl Into<String>) -> Self {
        Self::AudiencePacking {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
