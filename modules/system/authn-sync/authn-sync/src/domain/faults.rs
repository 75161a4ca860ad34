//! Best-effort outcome accumulation.
//!
//! Every device call of a pass goes through [`FaultLog::record`]. Failures
//! whose message matches the call site's allow-list are suppressed; all
//! others are kept in order. Nothing here stops the pass.

use std::fmt;

use authn_sync_sdk::{BindingKind, ResourceKind, SessionError};

/// What a device call tried to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Version,
    Create,
    Update,
    Unset,
    Delete,
    Find,
    List,
    Bind,
    Unbind,
    ConfigureTls,
    Upload,
    Remove,
}

impl Action {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Version => "query version",
            Self::Create => "create",
            Self::Update => "update",
            Self::Unset => "unset",
            Self::Delete => "delete",
            Self::Find => "find",
            Self::List => "list",
            Self::Bind => "bind",
            Self::Unbind => "unbind",
            Self::ConfigureTls => "configure tls",
            Self::Upload => "upload",
            Self::Remove => "remove",
        }
    }
}

/// Object a device call addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Device,
    Resource { kind: ResourceKind, name: String },
    Binding { kind: BindingKind, owner: String, target: String },
    File { name: String },
}

/// A device call, for fault reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub action: Action,
    pub target: Target,
}

impl Operation {
    #[must_use]
    pub fn resource(action: Action, kind: ResourceKind, name: &str) -> Self {
        Self {
            action,
            target: Target::Resource {
                kind,
                name: name.to_owned(),
            },
        }
    }

    #[must_use]
    pub fn binding(action: Action, kind: BindingKind, owner: &str, target: &str) -> Self {
        Self {
            action,
            target: Target::Binding {
                kind,
                owner: owner.to_owned(),
                target: target.to_owned(),
            },
        }
    }

    #[must_use]
    pub fn file(action: Action, name: &str) -> Self {
        Self {
            action,
            target: Target::File {
                name: name.to_owned(),
            },
        }
    }

    #[must_use]
    pub const fn device(action: Action) -> Self {
        Self {
            action,
            target: Target::Device,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = self.action.as_str();
        match &self.target {
            Target::Device => write!(f, "{action}"),
            Target::Resource { kind, name } => write!(f, "{action} {kind} '{name}'"),
            Target::Binding {
                kind,
                owner,
                target,
            } => write!(f, "{action} {kind} '{owner}' -> '{target}'"),
            Target::File { name } => write!(f, "{action} file '{name}'"),
        }
    }
}

/// A failed device call that was not on the call site's allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation}: {error}")]
pub struct Fault {
    pub operation: Operation,
    #[source]
    pub error: SessionError,
}

/// Ordered faults of one pass.
#[derive(Debug, Default)]
pub struct FaultLog {
    faults: Vec<Fault>,
    suppressed: usize,
}

impl FaultLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of `operation`.
    ///
    /// Returns the success value, or `None` when the call failed, whether or
    /// not the failure was suppressed by `ignorable`.
    pub fn record<T>(
        &mut self,
        operation: Operation,
        result: Result<T, SessionError>,
        ignorable: &[&str],
    ) -> Option<T> {
        match result {
            Ok(value) => {
                tracing::trace!(%operation, "device call succeeded");
                Some(value)
            }
            Err(error) if error.matches_any(ignorable) => {
                tracing::debug!(%operation, %error, "ignorable device outcome");
                self.suppressed += 1;
                None
            }
            Err(error) => {
                tracing::warn!(%operation, %error, "device call failed");
                self.faults.push(Fault { operation, error });
                None
            }
        }
    }

    #[must_use]
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    #[must_use]
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<Fault>, usize) {
        (self.faults, self.suppressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authn_sync_sdk::messages;

    #[test]
    fn test_failures_accumulate_in_order() {
        let mut log = FaultLog::new();
        let first = Operation::resource(Action::Create, ResourceKind::AuthPolicy, "p_10");
        let second = Operation::file(Action::Upload, "jwks_ab");

        assert_eq!(
            log.record::<()>(first.clone(), Err(SessionError::rejected("boom")), &[]),
            None
        );
        assert_eq!(log.record(second.clone(), Ok(7), &[]), Some(7));
        log.record::<()>(second.clone(), Err(SessionError::transport("reset")), &[]);

        let ops: Vec<_> = log.faults().iter().map(|f| f.operation.clone()).collect();
        assert_eq!(ops, vec![first, second]);
        assert_eq!(log.suppressed(), 0);
    }

    #[test]
    fn test_allow_list_suppresses() {
        let mut log = FaultLog::new();
        let op = Operation::binding(Action::Bind, BindingKind::AuthPolicy, "vs", "vs_10");
        let err = SessionError::rejected(messages::PRIORITY_IN_USE);
        assert_eq!(log.record::<()>(op, Err(err), &[messages::PRIORITY_IN_USE]), None);
        assert!(log.faults().is_empty());
        assert_eq!(log.suppressed(), 1);
    }

    #[test]
    fn test_fault_display() {
        let fault = Fault {
            operation: Operation::resource(Action::Delete, ResourceKind::LoginSchema, "vs_lgnschm_10"),
            error: SessionError::rejected("Resource is still referenced"),
        };
        assert_eq!(
            fault.to_string(),
            "delete authenticationloginschema 'vs_lgnschm_10': Resource is still referenced"
        );
    }
}
