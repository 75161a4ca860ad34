//! Plugin API traits for device implementations.
//!
//! The engine drives the device exclusively through these traits. Each call
//! is awaited to completion before the next is issued; implementations do
//! not need to handle overlapping calls from one synthesis pass.

use async_trait::async_trait;

use crate::error::SessionError;
use crate::models::{
    Binding, BindingKind, DeviceVersion, Field, FrontendTls, Resource, ResourceKind,
};

/// Session against the remote configuration store of a gateway device.
///
/// Implementations must report device refusals as
/// [`SessionError::Rejected`] carrying the device text, so that callers can
/// match the well-known [`messages`](crate::messages).
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Firmware release and build of the device.
    async fn version(&self) -> Result<DeviceVersion, SessionError>;

    /// Create a new named object.
    ///
    /// # Errors
    ///
    /// Rejected with [`RESOURCE_EXISTS`](crate::messages::RESOURCE_EXISTS) when the name is taken.
    async fn create(&self, resource: &Resource) -> Result<(), SessionError>;

    /// Overwrite the settable fields of an existing object.
    ///
    /// # Errors
    ///
    /// Rejected with [`NO_SUCH_RESOURCE`](crate::messages::NO_SUCH_RESOURCE) when absent.
    async fn update(&self, resource: &Resource) -> Result<(), SessionError>;

    /// Reset fields of an existing object to their defaults.
    async fn unset(
        &self,
        kind: ResourceKind,
        name: &str,
        fields: &[Field],
    ) -> Result<(), SessionError>;

    /// Delete an object by kind and name.
    ///
    /// # Errors
    ///
    /// Rejected when absent, or when another object still references it.
    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), SessionError>;

    /// Look an object up by kind and name.
    async fn find(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<Resource>, SessionError>;

    /// List all objects of a kind.
    async fn find_all(&self, kind: ResourceKind) -> Result<Vec<Resource>, SessionError>;

    /// Attach a policy or pattern to its owner.
    ///
    /// # Errors
    ///
    /// Rejected with [`PRIORITY_IN_USE`](crate::messages::PRIORITY_IN_USE) when
    /// the owner already has a binding at that priority.
    async fn bind(&self, binding: &Binding) -> Result<(), SessionError>;

    /// Detach a policy or pattern from its owner.
    async fn unbind(&self, binding: &Binding) -> Result<(), SessionError>;

    /// List bindings of `kind` attached to `owner`.
    async fn list_bindings(
        &self,
        kind: BindingKind,
        owner: &str,
    ) -> Result<Vec<Binding>, SessionError>;

    /// Apply TLS termination to a vserver.
    async fn configure_frontend_tls(
        &self,
        vserver: &str,
        tls: &[FrontendTls],
    ) -> Result<(), SessionError>;
}

/// File store on the device holding key material.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Whether a file with this name is present.
    async fn exists(&self, name: &str) -> Result<bool, SessionError>;

    /// Store a file; `content_b64` is the base64-encoded payload.
    async fn upload(&self, name: &str, content_b64: &str) -> Result<(), SessionError>;

    /// Remove a file.
    async fn remove(&self, name: &str) -> Result<(), SessionError>;
}
