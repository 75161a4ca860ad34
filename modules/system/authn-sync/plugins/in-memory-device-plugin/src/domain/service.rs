//! Simulated device state.

use std::collections::HashMap;

use authn_sync_sdk::{
    Binding, BindingKind, DeviceVersion, Field, FrontendTls, Resource, ResourceKind,
    SessionError, messages,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;

use crate::config::InMemoryDeviceConfig;

/// Actions that exist on every device and cannot be created or deleted.
pub const BUILTIN_ACTIONS: &[&str] = &["NO_AUTHN"];

/// Kind of a journaled call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Version,
    Create,
    Update,
    Unset,
    Delete,
    Find,
    FindAll,
    Bind,
    Unbind,
    ListBindings,
    ConfigureTls,
    Exists,
    Upload,
    Remove,
}

impl CallKind {
    /// Whether the call changes device state when it succeeds.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::Create
                | Self::Update
                | Self::Unset
                | Self::Delete
                | Self::Bind
                | Self::Unbind
                | Self::ConfigureTls
                | Self::Upload
                | Self::Remove
        )
    }

    /// Whether the call removes something from the device.
    #[must_use]
    pub const fn is_removal(self) -> bool {
        matches!(self, Self::Delete | Self::Unbind | Self::Remove)
    }
}

/// One journaled call; `subject` reads like `authenticationpolicy/vs_10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: CallKind,
    pub subject: String,
}

#[derive(Debug)]
struct InjectedFailure {
    kind: CallKind,
    subject: String,
    error: SessionError,
}

#[derive(Debug, Default)]
struct DeviceState {
    resources: HashMap<(ResourceKind, String), Resource>,
    bindings: Vec<Binding>,
    files: HashMap<String, Vec<u8>>,
    tls: HashMap<String, Vec<FrontendTls>>,
    calls: Vec<Call>,
    failures: Vec<InjectedFailure>,
}

fn rejected(message: impl Into<String>) -> SessionError {
    SessionError::rejected(message)
}

fn key(kind: ResourceKind, name: &str) -> (ResourceKind, String) {
    (kind, name.to_owned())
}

impl DeviceState {
    /// Journal the call and fail it when an injected failure matches.
    fn enter(&mut self, kind: CallKind, subject: String) -> Result<(), SessionError> {
        tracing::trace!(?kind, %subject, "in-memory device call");
        let injected = self
            .failures
            .iter()
            .find(|f| f.kind == kind && subject.contains(&f.subject))
            .map(|f| f.error.clone());
        self.calls.push(Call { kind, subject });
        injected.map_or(Ok(()), Err)
    }

    fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.resources.contains_key(&key(kind, name))
    }

    /// Objects a resource points at must exist.
    fn check_references(&self, resource: &Resource) -> Result<(), SessionError> {
        let missing = match resource {
            Resource::AuthPolicy(policy) => {
                !BUILTIN_ACTIONS.contains(&policy.action.as_str())
                    && !self.contains(ResourceKind::OAuthAction, &policy.action)
            }
            Resource::LoginSchemaPolicy(policy) => {
                !self.contains(ResourceKind::LoginSchema, &policy.action)
            }
            _ => false,
        };
        if missing {
            return Err(rejected(format!(
                "{} [action, {}]",
                messages::NO_SUCH_RESOURCE,
                resource.name()
            )));
        }
        Ok(())
    }

    /// Description of what still references `kind`/`name`, if anything.
    fn referrer(&self, kind: ResourceKind, name: &str) -> Option<String> {
        let bound = |binding_kind: BindingKind| {
            self.bindings
                .iter()
                .find(|b| b.kind == binding_kind && b.target == name)
                .map(|b| format!("bound to {}", b.owner))
        };
        match kind {
            ResourceKind::AuthPolicy => bound(BindingKind::AuthPolicy),
            ResourceKind::LoginSchemaPolicy => bound(BindingKind::LoginSchemaPolicy),
            ResourceKind::OAuthAction => self.resources.values().find_map(|r| match r {
                Resource::AuthPolicy(p) if p.action == name => Some(format!("used by {}", p.name)),
                _ => None,
            }),
            ResourceKind::LoginSchema => self.resources.values().find_map(|r| match r {
                Resource::LoginSchemaPolicy(p) if p.action == name => {
                    Some(format!("used by {}", p.name))
                }
                _ => None,
            }),
            ResourceKind::PatternSet => self.resources.values().find_map(|r| match r {
                Resource::OAuthAction(a) if a.audience.as_deref() == Some(name) => {
                    Some(format!("used by {}", a.name))
                }
                _ => None,
            }),
            ResourceKind::AuthVserver | ResourceKind::CsVserver => None,
        }
    }
}

/// In-memory gateway device.
pub struct Service {
    version: Mutex<DeviceVersion>,
    state: Mutex<DeviceState>,
}

impl Service {
    #[must_use]
    pub fn new(config: &InMemoryDeviceConfig) -> Self {
        Self {
            version: Mutex::new(config.version()),
            state: Mutex::new(DeviceState::default()),
        }
    }

    // === Device operations ===

    /// # Errors
    /// Only injected failures.
    pub fn version(&self) -> Result<DeviceVersion, SessionError> {
        self.state.lock().enter(CallKind::Version, String::new())?;
        Ok(*self.version.lock())
    }

    /// # Errors
    /// Rejected when the name is taken or a referenced object is missing.
    pub fn create(&self, resource: &Resource) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Create, subject(resource.kind(), resource.name()))?;
        if state.contains(resource.kind(), resource.name()) {
            return Err(rejected(messages::RESOURCE_EXISTS));
        }
        state.check_references(resource)?;
        state
            .resources
            .insert(key(resource.kind(), resource.name()), resource.clone());
        Ok(())
    }

    /// # Errors
    /// Rejected when absent or a referenced object is missing.
    pub fn update(&self, resource: &Resource) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Update, subject(resource.kind(), resource.name()))?;
        if !state.contains(resource.kind(), resource.name()) {
            return Err(rejected(messages::NO_SUCH_RESOURCE));
        }
        state.check_references(resource)?;
        state
            .resources
            .insert(key(resource.kind(), resource.name()), resource.clone());
        Ok(())
    }

    /// # Errors
    /// Rejected when absent or a field does not belong to the object.
    pub fn unset(&self, kind: ResourceKind, name: &str, fields: &[Field]) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Unset, subject(kind, name))?;
        let Some(resource) = state.resources.get_mut(&key(kind, name)) else {
            return Err(rejected(messages::NO_SUCH_RESOURCE));
        };
        for field in fields {
            match (&mut *resource, field) {
                (Resource::OAuthAction(action), Field::Audience) => action.audience = None,
                (Resource::CsVserver(cs), Field::Authn401) => cs.authn_401 = false,
                (Resource::CsVserver(cs), Field::AuthnVsName) => cs.authn_vserver.clear(),
                _ => {
                    return Err(rejected(format!(
                        "Invalid argument [{}]",
                        field.as_str()
                    )));
                }
            }
        }
        Ok(())
    }

    /// # Errors
    /// Rejected when absent or still referenced.
    pub fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Delete, subject(kind, name))?;
        if !state.contains(kind, name) {
            return Err(rejected(messages::NO_SUCH_RESOURCE));
        }
        if let Some(referrer) = state.referrer(kind, name) {
            return Err(rejected(format!(
                "{} [{referrer}]",
                messages::RESOURCE_IN_USE
            )));
        }
        state.resources.remove(&key(kind, name));
        match kind {
            ResourceKind::AuthVserver => {
                state
                    .bindings
                    .retain(|b| b.kind == BindingKind::PatternSetEntry || b.owner != name);
                state.tls.remove(name);
            }
            ResourceKind::PatternSet => {
                state
                    .bindings
                    .retain(|b| b.kind != BindingKind::PatternSetEntry || b.owner != name);
            }
            _ => {}
        }
        Ok(())
    }

    /// # Errors
    /// Only injected failures.
    pub fn find(&self, kind: ResourceKind, name: &str) -> Result<Option<Resource>, SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Find, subject(kind, name))?;
        Ok(state.resources.get(&key(kind, name)).cloned())
    }

    /// Objects of `kind` ordered by name.
    ///
    /// # Errors
    /// Only injected failures.
    pub fn find_all(&self, kind: ResourceKind) -> Result<Vec<Resource>, SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::FindAll, kind.to_string())?;
        Ok(sorted_resources(&state, kind))
    }

    /// # Errors
    /// Rejected when owner or target is missing, the priority is taken, or
    /// the binding exists.
    pub fn bind(&self, binding: &Binding) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Bind, binding_subject(binding))?;
        let (owner_kind, target_kind) = match binding.kind {
            BindingKind::AuthPolicy => (ResourceKind::AuthVserver, Some(ResourceKind::AuthPolicy)),
            BindingKind::LoginSchemaPolicy => (
                ResourceKind::AuthVserver,
                Some(ResourceKind::LoginSchemaPolicy),
            ),
            BindingKind::PatternSetEntry => (ResourceKind::PatternSet, None),
        };
        if !state.contains(owner_kind, &binding.owner) {
            return Err(rejected(messages::NO_SUCH_RESOURCE));
        }
        if target_kind.is_some_and(|kind| !state.contains(kind, &binding.target)) {
            return Err(rejected(messages::NO_SUCH_RESOURCE));
        }
        let same_owner = |b: &&Binding| b.kind == binding.kind && b.owner == binding.owner;
        if binding.priority.is_some()
            && state
                .bindings
                .iter()
                .filter(same_owner)
                .any(|b| b.priority == binding.priority)
        {
            return Err(rejected(format!(
                "{} [priority, {}]",
                messages::PRIORITY_IN_USE,
                binding.priority.unwrap_or_default()
            )));
        }
        if state
            .bindings
            .iter()
            .filter(same_owner)
            .any(|b| b.target == binding.target)
        {
            return Err(rejected(messages::RESOURCE_EXISTS));
        }
        state.bindings.push(binding.clone());
        Ok(())
    }

    /// # Errors
    /// Rejected when the binding does not exist.
    pub fn unbind(&self, binding: &Binding) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Unbind, binding_subject(binding))?;
        let position = state.bindings.iter().position(|b| {
            b.kind == binding.kind && b.owner == binding.owner && b.target == binding.target
        });
        let Some(position) = position else {
            return Err(rejected(messages::NO_SUCH_RESOURCE));
        };
        state.bindings.remove(position);
        Ok(())
    }

    /// Bindings of `kind` on `owner` ordered by priority.
    ///
    /// # Errors
    /// Rejected when the owner does not exist.
    pub fn list_bindings(&self, kind: BindingKind, owner: &str) -> Result<Vec<Binding>, SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::ListBindings, format!("{kind}/{owner}"))?;
        let owner_kind = match kind {
            BindingKind::AuthPolicy | BindingKind::LoginSchemaPolicy => ResourceKind::AuthVserver,
            BindingKind::PatternSetEntry => ResourceKind::PatternSet,
        };
        if !state.contains(owner_kind, owner) {
            return Err(rejected(messages::NO_SUCH_RESOURCE));
        }
        Ok(sorted_bindings(&state, kind, owner))
    }

    /// # Errors
    /// Rejected when the vserver does not exist.
    pub fn configure_frontend_tls(&self, vserver: &str, tls: &[FrontendTls]) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::ConfigureTls, subject(ResourceKind::AuthVserver, vserver))?;
        if !state.contains(ResourceKind::AuthVserver, vserver) {
            return Err(rejected(messages::NO_SUCH_RESOURCE));
        }
        state.tls.insert(vserver.to_owned(), tls.to_vec());
        Ok(())
    }

    // === Content store operations ===

    /// # Errors
    /// Only injected failures.
    pub fn file_exists(&self, name: &str) -> Result<bool, SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Exists, file_subject(name))?;
        Ok(state.files.contains_key(name))
    }

    /// # Errors
    /// Rejected when the file exists or the content is not valid base64.
    pub fn upload(&self, name: &str, content_b64: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Upload, file_subject(name))?;
        if state.files.contains_key(name) {
            return Err(rejected(messages::RESOURCE_EXISTS));
        }
        let content = STANDARD
            .decode(content_b64)
            .map_err(|e| rejected(format!("Invalid file content: {e}")))?;
        state.files.insert(name.to_owned(), content);
        Ok(())
    }

    /// # Errors
    /// Rejected when absent or referenced by a validation action.
    pub fn remove_file(&self, name: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.enter(CallKind::Remove, file_subject(name))?;
        if !state.files.contains_key(name) {
            return Err(rejected(messages::NO_SUCH_RESOURCE));
        }
        let referrer = state.resources.values().find_map(|r| match r {
            Resource::OAuthAction(a) if a.cert_file_name() == name => Some(a.name.clone()),
            _ => None,
        });
        if let Some(referrer) = referrer {
            return Err(rejected(format!(
                "{} [used by {referrer}]",
                messages::RESOURCE_IN_USE
            )));
        }
        state.files.remove(name);
        Ok(())
    }

    // === Inspection and scripting ===

    /// Report a different firmware from now on.
    pub fn set_version(&self, version: DeviceVersion) {
        *self.version.lock() = version;
    }

    /// Fail every later call of `kind` whose subject contains `subject`.
    pub fn fail_on(&self, kind: CallKind, subject: &str, error: SessionError) {
        self.state.lock().failures.push(InjectedFailure {
            kind,
            subject: subject.to_owned(),
            error,
        });
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    #[must_use]
    pub fn resource(&self, kind: ResourceKind, name: &str) -> Option<Resource> {
        self.state.lock().resources.get(&key(kind, name)).cloned()
    }

    #[must_use]
    pub fn resources(&self, kind: ResourceKind) -> Vec<Resource> {
        sorted_resources(&self.state.lock(), kind)
    }

    /// Total number of objects of all kinds.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.state.lock().resources.len()
    }

    #[must_use]
    pub fn bindings(&self, kind: BindingKind, owner: &str) -> Vec<Binding> {
        sorted_bindings(&self.state.lock(), kind, owner)
    }

    /// Names of stored files, sorted.
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().files.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(name).cloned()
    }

    #[must_use]
    pub fn frontend_tls(&self, vserver: &str) -> Vec<FrontendTls> {
        self.state
            .lock()
            .tls
            .get(vserver)
            .cloned()
            .unwrap_or_default()
    }
}

fn subject(kind: ResourceKind, name: &str) -> String {
    format!("{kind}/{name}")
}

fn binding_subject(binding: &Binding) -> String {
    format!("{}/{}/{}", binding.kind, binding.owner, binding.target)
}

fn file_subject(name: &str) -> String {
    format!("file/{name}")
}

fn sorted_resources(state: &DeviceState, kind: ResourceKind) -> Vec<Resource> {
    let mut found: Vec<_> = state
        .resources
        .iter()
        .filter(|((k, _), _)| *k == kind)
        .map(|(_, r)| r.clone())
        .collect();
    found.sort_by(|a, b| a.name().cmp(b.name()));
    found
}

fn sorted_bindings(state: &DeviceState, kind: BindingKind, owner: &str) -> Vec<Binding> {
    let mut found: Vec<_> = state
        .bindings
        .iter()
        .filter(|b| b.kind == kind && b.owner == owner)
        .cloned()
        .collect();
    found.sort_by_key(|b| b.priority);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use authn_sync_sdk::{
        AuthVserver, ClientSecret, OAuthAction, PatternSet, Policy, VersionNumber,
    };

    fn device() -> Service {
        Service::new(&InMemoryDeviceConfig::default())
    }

    fn vserver(name: &str) -> Resource {
        Resource::AuthVserver(AuthVserver {
            name: name.to_owned(),
            service_type: "SSL".to_owned(),
            ipv46: "0.0.0.0".to_owned(),
        })
    }

    fn action(name: &str, file: &str, audience: Option<&str>) -> Resource {
        Resource::OAuthAction(OAuthAction {
            name: name.to_owned(),
            authorization_endpoint: "https://dummy.com".to_owned(),
            token_endpoint: "https://dummy.com".to_owned(),
            client_id: "id".to_owned(),
            client_secret: ClientSecret::new("secret"),
            issuer: "https://issuer".to_owned(),
            cert_file_path: format!("/nsconfig/ssl/{file}"),
            audience: audience.map(ToOwned::to_owned),
        })
    }

    fn policy(name: &str, action: &str) -> Resource {
        Resource::AuthPolicy(Policy {
            name: name.to_owned(),
            rule: "true".to_owned(),
            action: action.to_owned(),
        })
    }

    #[test]
    fn test_create_twice_reports_exists() {
        let device = device();
        device.create(&vserver("vs")).unwrap();
        let err = device.create(&vserver("vs")).unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn test_policy_requires_action_unless_builtin() {
        let device = device();
        assert!(device.create(&policy("vs_10", "vs_10")).unwrap_err().is_not_found());
        device.create(&policy("vs_20", "NO_AUTHN")).unwrap();
    }

    #[test]
    fn test_bound_policy_cannot_be_deleted() {
        let device = device();
        device.create(&vserver("vs")).unwrap();
        device.create(&policy("vs_20", "NO_AUTHN")).unwrap();
        let binding = Binding::policy(BindingKind::AuthPolicy, "vs", "vs_20", 20);
        device.bind(&binding).unwrap();

        let err = device.delete(ResourceKind::AuthPolicy, "vs_20").unwrap_err();
        assert!(err.matches_any(&[messages::RESOURCE_IN_USE]));

        device.unbind(&binding).unwrap();
        device.delete(ResourceKind::AuthPolicy, "vs_20").unwrap();
    }

    #[test]
    fn test_priority_collision_is_reported() {
        let device = device();
        device.create(&vserver("vs")).unwrap();
        device.create(&policy("a", "NO_AUTHN")).unwrap();
        device.create(&policy("b", "NO_AUTHN")).unwrap();
        device
            .bind(&Binding::policy(BindingKind::AuthPolicy, "vs", "a", 10))
            .unwrap();

        let err = device
            .bind(&Binding::policy(BindingKind::AuthPolicy, "vs", "b", 10))
            .unwrap_err();
        assert!(err.matches_any(&[messages::PRIORITY_IN_USE]));
    }

    #[test]
    fn test_referenced_file_and_pattern_set_are_kept() {
        let device = device();
        device.upload("jwks_ab", &STANDARD.encode(b"{}")).unwrap();
        device
            .create(&Resource::PatternSet(PatternSet {
                name: "vs".to_owned(),
            }))
            .unwrap();
        device.create(&action("vs_10", "jwks_ab", Some("vs"))).unwrap();

        assert!(device.remove_file("jwks_ab").is_err());
        assert!(device.delete(ResourceKind::PatternSet, "vs").is_err());

        device
            .unset(ResourceKind::OAuthAction, "vs_10", &[Field::Audience])
            .unwrap();
        device.delete(ResourceKind::PatternSet, "vs").unwrap();
        device.delete(ResourceKind::OAuthAction, "vs_10").unwrap();
        device.remove_file("jwks_ab").unwrap();
        assert!(device.files().is_empty());
    }

    #[test]
    fn test_upload_stores_decoded_content() {
        let device = device();
        device.upload("f", &STANDARD.encode(b"payload")).unwrap();
        assert_eq!(device.file("f").as_deref(), Some(&b"payload"[..]));
        assert!(device.upload("g", "not base64!").is_err());
    }

    #[test]
    fn test_deleting_vserver_drops_its_bindings() {
        let device = device();
        device.create(&vserver("vs")).unwrap();
        device.create(&policy("vs_20", "NO_AUTHN")).unwrap();
        device
            .bind(&Binding::policy(BindingKind::AuthPolicy, "vs", "vs_20", 20))
            .unwrap();

        device.delete(ResourceKind::AuthVserver, "vs").unwrap();

        assert!(device.bindings(BindingKind::AuthPolicy, "vs").is_empty());
        assert!(
            device
                .list_bindings(BindingKind::AuthPolicy, "vs")
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_injected_failures_and_journal() {
        let device = device();
        device.fail_on(
            CallKind::Create,
            "authenticationvserver/",
            SessionError::transport("connection reset"),
        );

        assert!(device.create(&vserver("vs")).is_err());
        assert!(device.resource(ResourceKind::AuthVserver, "vs").is_none());

        device.clear_failures();
        device.create(&vserver("vs")).unwrap();

        let calls = device.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.kind == CallKind::Create));
        assert_eq!(calls[0].subject, "authenticationvserver/vs");
    }

    #[test]
    fn test_set_version() {
        let device = device();
        let old = DeviceVersion::new(VersionNumber::new(12, 1), VersionNumber::new(50, 0));
        device.set_version(old);
        assert_eq!(device.version().unwrap(), old);
    }
}
