//! Emission of the device objects implied by an [`AuthSpec`].

use authn_sync_sdk::{
    AuthSpec, AuthVserver, Binding, BindingKind, Field, LoginSchema, OAuthAction, PatternSet,
    Policy, Resource, ResourceKind,
};

use super::audience::PackedAudience;
use super::error::DomainError;
use super::faults::{Action, Operation};
use super::key_material;
use super::pass::Pass;
use super::priority::{HighWaterMarks, PriorityAllocator};
use super::rules::{self, CompiledRules};
use crate::config::AuthnSyncConfig;

/// Built-in action that lets a request through unauthenticated.
pub const NO_AUTHN_ACTION: &str = "NO_AUTHN";

/// Schema type of login schemas that only extract a credential.
pub const NO_SCHEMA: &str = "noschema";

/// Part of a policy or validation action name preceding its priority.
#[must_use]
pub fn policy_prefix(vserver: &str) -> String {
    format!("{vserver}_")
}

/// Part of a login schema or login-schema policy name preceding its priority.
#[must_use]
pub fn login_schema_prefix(vserver: &str) -> String {
    format!("{vserver}_lgnschm_")
}

#[must_use]
pub fn policy_name(vserver: &str, priority: u32) -> String {
    format!("{}{priority}", policy_prefix(vserver))
}

#[must_use]
pub fn login_schema_name(vserver: &str, priority: u32) -> String {
    format!("{}{priority}", login_schema_prefix(vserver))
}

/// Validated, device-independent part of a synthesis pass.
#[derive(Debug)]
pub struct Plan<'s> {
    pub spec: &'s AuthSpec,
    pub rules: CompiledRules,
    /// Content-addressed file name of the JWKS payload.
    pub key_name: String,
}

impl<'s> Plan<'s> {
    /// Validate `spec` and derive everything that does not depend on the device.
    ///
    /// # Errors
    /// Returns a [`DomainError`] describing the first problem found.
    pub fn prepare(spec: &'s AuthSpec, config: &AuthnSyncConfig) -> Result<Self, DomainError> {
        if spec.name.is_empty() {
            return Err(DomainError::invalid_spec("name", "must not be empty"));
        }
        if spec.jwks.is_empty() {
            return Err(DomainError::invalid_spec("jwks", "must not be empty"));
        }
        for (index, header) in spec.jwt_headers.iter().enumerate() {
            rules::validate_name(&format!("jwt_headers[{index}].name"), &header.name)?;
            rules::validate_literal(&format!("jwt_headers[{index}].prefix"), &header.prefix)?;
        }
        for (index, param) in spec.jwt_params.iter().enumerate() {
            rules::validate_name(&format!("jwt_params[{index}]"), param)?;
        }

        let rules = rules::compile(&spec.include_paths, &spec.exclude_paths)?;
        let key_name = key_material::content_name(spec.jwks.as_bytes(), config.content_name_max_len)?;
        Ok(Self {
            spec,
            rules,
            key_name,
        })
    }
}

/// Create or update every object of `plan` and return the pass's cutoffs.
///
/// Objects are emitted in dependency order: vserver, key material, audience
/// pattern set, validation action, authentication policies, login schemas.
pub async fn synthesize(
    pass: &mut Pass<'_>,
    plan: &Plan<'_>,
    audience: &PackedAudience,
) -> HighWaterMarks {
    let spec = plan.spec;
    let vserver = spec.name.as_str();
    let config = pass.config;
    let mut priorities = PriorityAllocator::new();

    tracing::debug!(vserver, "ensuring auth vserver");
    pass.create_if_absent(&Resource::AuthVserver(AuthVserver {
        name: vserver.to_owned(),
        service_type: "SSL".to_owned(),
        ipv46: "0.0.0.0".to_owned(),
    }))
    .await;

    key_material::ensure(pass, &plan.key_name, spec.jwks.as_bytes()).await;

    if let PackedAudience::PatternSet { name, patterns } = audience {
        sync_pattern_set(pass, name, patterns).await;
    }

    let primary = priorities.next_policy();
    let primary_name = policy_name(vserver, primary);
    let previous_key = match pass.find(ResourceKind::OAuthAction, &primary_name).await {
        Some(Resource::OAuthAction(action)) if action.cert_file_name() != plan.key_name => {
            Some(action.cert_file_name().to_owned())
        }
        _ => None,
    };
    tracing::debug!(action = %primary_name, audience = ?audience.field_value(), "upserting validation action");
    pass.upsert(&Resource::OAuthAction(OAuthAction {
        name: primary_name.clone(),
        authorization_endpoint: config.placeholder_endpoint.clone(),
        token_endpoint: config.placeholder_endpoint.clone(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        issuer: spec.issuer.clone(),
        cert_file_path: key_material::file_path(&config.cert_dir, &plan.key_name),
        audience: audience.field_value().map(ToOwned::to_owned),
    }))
    .await;

    if let Some(previous_key) = previous_key {
        tracing::info!(from = %previous_key, to = %plan.key_name, "key material rotated");
        key_material::release_if_unreferenced(pass, &previous_key).await;
    }

    if audience.field_value().is_none() {
        pass.unset(ResourceKind::OAuthAction, &primary_name, &[Field::Audience])
            .await;
    }
    if !matches!(audience, PackedAudience::PatternSet { .. }) {
        drop_pattern_set(pass, vserver).await;
    }

    emit_policy(
        pass,
        vserver,
        primary,
        &plan.rules.policy_rule,
        &primary_name,
    )
    .await;
    if let Some(exclude_rule) = &plan.rules.exclude_rule {
        let priority = priorities.next_policy();
        emit_policy(pass, vserver, priority, exclude_rule, NO_AUTHN_ACTION).await;
    }

    let policy_rule = plan.rules.policy_rule.as_str();
    for header in &spec.jwt_headers {
        let priority = priorities.next_login_schema();
        emit_login_schema(
            pass,
            vserver,
            priority,
            rules::login_schema_rule(policy_rule, &rules::header_presence(&header.name)),
            rules::header_user_expression(header),
        )
        .await;
    }
    for param in &spec.jwt_params {
        let priority = priorities.next_login_schema();
        emit_login_schema(
            pass,
            vserver,
            priority,
            rules::login_schema_rule(policy_rule, &rules::param_presence(param)),
            rules::param_user_expression(param),
        )
        .await;
    }

    if !spec.frontend_tls.is_empty() {
        let result = pass
            .session
            .configure_frontend_tls(vserver, &spec.frontend_tls)
            .await;
        pass.faults.record(
            Operation::resource(Action::ConfigureTls, ResourceKind::AuthVserver, vserver),
            result,
            &[],
        );
    }

    priorities.high_water_marks()
}

async fn emit_policy(pass: &mut Pass<'_>, vserver: &str, priority: u32, rule: &str, action: &str) {
    let name = policy_name(vserver, priority);
    tracing::debug!(policy = %name, priority, "upserting authentication policy");
    pass.upsert(&Resource::AuthPolicy(Policy {
        name: name.clone(),
        rule: rule.to_owned(),
        action: action.to_owned(),
    }))
    .await;
    pass.bind(&Binding::policy(BindingKind::AuthPolicy, vserver, &name, priority))
        .await;
}

async fn emit_login_schema(
    pass: &mut Pass<'_>,
    vserver: &str,
    priority: u32,
    rule: String,
    user_expression: String,
) {
    let name = login_schema_name(vserver, priority);
    tracing::debug!(login_schema = %name, priority, "upserting login schema");
    pass.upsert(&Resource::LoginSchema(LoginSchema {
        name: name.clone(),
        authentication_schema: NO_SCHEMA.to_owned(),
        user_expression,
    }))
    .await;
    pass.upsert(&Resource::LoginSchemaPolicy(Policy {
        name: name.clone(),
        rule,
        action: name.clone(),
    }))
    .await;
    pass.bind(&Binding::policy(
        BindingKind::LoginSchemaPolicy,
        vserver,
        &name,
        priority,
    ))
    .await;
}

/// Make the entries of pattern set `name` equal to `patterns`.
async fn sync_pattern_set(pass: &mut Pass<'_>, name: &str, patterns: &[String]) {
    pass.create_if_absent(&Resource::PatternSet(PatternSet {
        name: name.to_owned(),
    }))
    .await;

    let existing = pass
        .list_bindings(BindingKind::PatternSetEntry, name)
        .await;
    for entry in &existing {
        if !patterns.contains(&entry.target) {
            tracing::debug!(pattern_set = name, pattern = %entry.target, "unbinding audience");
            pass.unbind(entry).await;
        }
    }
    for pattern in patterns {
        if !existing.iter().any(|entry| &entry.target == pattern) {
            pass.bind(&Binding::pattern(name, pattern)).await;
        }
    }
}

/// Delete the audience pattern set of `vserver` if one is left over.
pub async fn drop_pattern_set(pass: &mut Pass<'_>, vserver: &str) {
    if pass.find(ResourceKind::PatternSet, vserver).await.is_some() {
        tracing::debug!(pattern_set = vserver, "deleting audience pattern set");
        pass.delete(ResourceKind::PatternSet, vserver).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authn_sync_sdk::{AuthRuleMatch, JwtHeader};

    fn spec() -> AuthSpec {
        AuthSpec {
            name: "cs1authn".to_owned(),
            jwks: "{\"keys\":[]}".to_owned(),
            ..AuthSpec::default()
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(policy_name("vs", 10), "vs_10");
        assert_eq!(login_schema_name("vs", 20), "vs_lgnschm_20");
    }

    #[test]
    fn test_prepare_derives_rules_and_key_name() {
        let spec = AuthSpec {
            include_paths: vec![AuthRuleMatch::prefix("/api")],
            ..spec()
        };
        let plan = Plan::prepare(&spec, &AuthnSyncConfig::default()).unwrap();
        assert_eq!(plan.rules.exclude_rule.as_deref(), Some(rules::TAUTOLOGY));
        assert_eq!(
            plan.key_name,
            key_material::content_name(spec.jwks.as_bytes(), 127).unwrap()
        );
    }

    #[test]
    fn test_prepare_rejects_bad_input() {
        let config = AuthnSyncConfig::default();
        let no_name = AuthSpec {
            name: String::new(),
            ..spec()
        };
        let no_jwks = AuthSpec {
            jwks: String::new(),
            ..spec()
        };
        let bad_header = AuthSpec {
            jwt_headers: vec![JwtHeader::new("x\"y")],
            ..spec()
        };
        let bad_param = AuthSpec {
            jwt_params: vec![String::new()],
            ..spec()
        };
        for bad in [no_name, no_jwks, bad_header, bad_param] {
            assert!(matches!(
                Plan::prepare(&bad, &config),
                Err(DomainError::InvalidSpec { .. })
            ));
        }
    }
}
