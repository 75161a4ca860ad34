//! Error types for the authn sync plugin API.

use thiserror::Error;

/// Messages the device returns for well-known outcomes.
///
/// Call sites match these as substrings to downgrade a failure to an
/// ignorable outcome. Plugin implementations must surface the device text
/// unchanged so that the match keeps working.
pub mod messages {
    /// Deleting, unsetting, or listing something that does not exist.
    pub const NO_SUCH_RESOURCE: &str = "No such resource";
    /// Creating an object whose name is taken.
    pub const RESOURCE_EXISTS: &str = "Resource already exists";
    /// Binding a policy at a priority that is already occupied on the owner.
    pub const PRIORITY_IN_USE: &str = "A policy is already bound to the specified priority";
    /// Deleting an object that another object still references.
    pub const RESOURCE_IN_USE: &str = "Resource is still referenced";
}

/// Error returned by [`DeviceSession`](crate::DeviceSession) and
/// [`ContentStore`](crate::ContentStore) implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The device processed the call and refused it.
    #[error("{message}")]
    Rejected {
        /// Device-provided message.
        message: String,
    },

    /// The call never reached the device or the reply was unusable.
    #[error("transport error: {message}")]
    Transport {
        /// Transport-level description.
        message: String,
    },
}

impl SessionError {
    /// Create a rejection carrying the device message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Raw message text, used for allow-list matching.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected { message } | Self::Transport { message } => message,
        }
    }

    /// Whether the message contains any of `needles`.
    #[must_use]
    pub fn matches_any(&self, needles: &[&str]) -> bool {
        let message = self.message();
        needles.iter().any(|needle| message.contains(needle))
    }

    /// The device refused to create an object because the name is taken.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Rejected { message } if message.contains(messages::RESOURCE_EXISTS))
    }

    /// The device reported that the addressed object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { message } if message.contains(messages::NO_SUCH_RESOURCE))
    }
}

/// A device release or build string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version number '{input}'")]
pub struct VersionParseError {
    /// Offending input.
    pub input: String,
}
