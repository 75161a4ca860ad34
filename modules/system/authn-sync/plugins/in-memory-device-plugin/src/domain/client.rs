//! Client implementation of the device plugin traits.

use std::sync::Arc;

use async_trait::async_trait;
use authn_sync_sdk::{
    Binding, BindingKind, ContentStore, DeviceSession, DeviceVersion, Field, FrontendTls, Resource,
    ResourceKind, SessionError,
};

use super::service::Service;

/// Client implementation for the in-memory device plugin.
///
/// Serves both the session and the content store of one device.
pub struct Client {
    service: Arc<Service>,
}

impl Client {
    /// Create a new client wrapping the service.
    #[must_use]
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DeviceSession for Client {
    async fn version(&self) -> Result<DeviceVersion, SessionError> {
        self.service.version()
    }

    async fn create(&self, resource: &Resource) -> Result<(), SessionError> {
        self.service.create(resource)
    }

    async fn update(&self, resource: &Resource) -> Result<(), SessionError> {
        self.service.update(resource)
    }

    async fn unset(
        &self,
        kind: ResourceKind,
        name: &str,
        fields: &[Field],
    ) -> Result<(), SessionError> {
        self.service.unset(kind, name, fields)
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), SessionError> {
        self.service.delete(kind, name)
    }

    async fn find(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<Resource>, SessionError> {
        self.service.find(kind, name)
    }

    async fn find_all(&self, kind: ResourceKind) -> Result<Vec<Resource>, SessionError> {
        self.service.find_all(kind)
    }

    async fn bind(&self, binding: &Binding) -> Result<(), SessionError> {
        self.service.bind(binding)
    }

    async fn unbind(&self, binding: &Binding) -> Result<(), SessionError> {
        self.service.unbind(binding)
    }

    async fn list_bindings(
        &self,
        kind: BindingKind,
        owner: &str,
    ) -> Result<Vec<Binding>, SessionError> {
        self.service.list_bindings(kind, owner)
    }

    async fn configure_frontend_tls(
        &self,
        vserver: &str,
        tls: &[FrontendTls],
    ) -> Result<(), SessionError> {
        self.service.configure_frontend_tls(vserver, tls)
    }
}

#[async_trait]
impl ContentStore for Client {
    async fn exists(&self, name: &str) -> Result<bool, SessionError> {
        self.service.file_exists(name)
    }

    async fn upload(&self, name: &str, content_b64: &str) -> Result<(), SessionError> {
        self.service.upload(name, content_b64)
    }

    async fn remove(&self, name: &str) -> Result<(), SessionError> {
        self.service.remove_file(name)
    }
}
