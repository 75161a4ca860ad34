//! Device access for one synthesis or teardown pass.
//!
//! Wraps the plugin traits so that every call is recorded in the pass's
//! [`FaultLog`] with the allow-list that applies to its kind of call.

use authn_sync_sdk::{
    Binding, BindingKind, ContentStore, DeviceSession, Field, Resource, ResourceKind, messages,
};

use super::faults::{Action, FaultLog, Operation};
use crate::config::AuthnSyncConfig;

pub struct Pass<'a> {
    pub(crate) session: &'a dyn DeviceSession,
    pub(crate) content: &'a dyn ContentStore,
    pub(crate) config: &'a AuthnSyncConfig,
    pub(crate) faults: FaultLog,
}

impl<'a> Pass<'a> {
    pub fn new(
        session: &'a dyn DeviceSession,
        content: &'a dyn ContentStore,
        config: &'a AuthnSyncConfig,
    ) -> Self {
        Self {
            session,
            content,
            config,
            faults: FaultLog::new(),
        }
    }

    /// Create unless an object with the same name exists.
    pub async fn create_if_absent(&mut self, resource: &Resource) {
        let op = Operation::resource(Action::Create, resource.kind(), resource.name());
        let result = self.session.create(resource).await;
        self.faults.record(op, result, &[messages::RESOURCE_EXISTS]);
    }

    /// Create, or update in place when the name is taken.
    pub async fn upsert(&mut self, resource: &Resource) {
        let (kind, name) = (resource.kind(), resource.name());
        match self.session.create(resource).await {
            Err(err) if err.is_already_exists() => {
                tracing::trace!(%kind, name, "exists, updating");
                let result = self.session.update(resource).await;
                self.faults
                    .record(Operation::resource(Action::Update, kind, name), result, &[]);
            }
            result => {
                self.faults
                    .record(Operation::resource(Action::Create, kind, name), result, &[]);
            }
        }
    }

    pub async fn update(&mut self, resource: &Resource) {
        let op = Operation::resource(Action::Update, resource.kind(), resource.name());
        let result = self.session.update(resource).await;
        self.faults.record(op, result, &[]);
    }

    pub async fn unset(&mut self, kind: ResourceKind, name: &str, fields: &[Field]) {
        let result = self.session.unset(kind, name, fields).await;
        self.faults.record(
            Operation::resource(Action::Unset, kind, name),
            result,
            &[messages::NO_SUCH_RESOURCE],
        );
    }

    /// Delete; an already absent object is not a fault.
    pub async fn delete(&mut self, kind: ResourceKind, name: &str) {
        let result = self.session.delete(kind, name).await;
        self.faults.record(
            Operation::resource(Action::Delete, kind, name),
            result,
            &[messages::NO_SUCH_RESOURCE],
        );
    }

    pub async fn find(&mut self, kind: ResourceKind, name: &str) -> Option<Resource> {
        let result = self.session.find(kind, name).await;
        self.faults
            .record(Operation::resource(Action::Find, kind, name), result, &[])
            .flatten()
    }

    /// All objects of `kind`, or `None` when they could not be listed.
    pub async fn find_all(&mut self, kind: ResourceKind) -> Option<Vec<Resource>> {
        let result = self.session.find_all(kind).await;
        self.faults
            .record(Operation::resource(Action::List, kind, "*"), result, &[])
    }

    /// Bind; a binding already occupying the priority is benign overlap.
    pub async fn bind(&mut self, binding: &Binding) {
        let result = self.session.bind(binding).await;
        self.faults.record(
            Operation::binding(Action::Bind, binding.kind, &binding.owner, &binding.target),
            result,
            &[messages::PRIORITY_IN_USE, messages::RESOURCE_EXISTS],
        );
    }

    pub async fn unbind(&mut self, binding: &Binding) {
        let result = self.session.unbind(binding).await;
        self.faults.record(
            Operation::binding(Action::Unbind, binding.kind, &binding.owner, &binding.target),
            result,
            &[messages::NO_SUCH_RESOURCE],
        );
    }

    /// Bindings of `kind` on `owner`; an absent owner has none.
    pub async fn list_bindings(&mut self, kind: BindingKind, owner: &str) -> Vec<Binding> {
        let result = self.session.list_bindings(kind, owner).await;
        self.faults
            .record(
                Operation::binding(Action::List, kind, owner, "*"),
                result,
                &[messages::NO_SUCH_RESOURCE],
            )
            .unwrap_or_default()
    }
}
