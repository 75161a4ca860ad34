//! Removal of bindings and objects left behind by earlier generations.
//!
//! A binding is stale when its priority lies above the cutoff of its
//! category. Stale objects are removed in reverse dependency order: the
//! binding first, then the policy, then whatever the policy pointed at.
//!
//! Objects are also found by name. A pass that unbound a policy but failed to
//! delete it leaves nothing to list through bindings, so every category is
//! swept a second time over the objects whose deterministic name carries a
//! stale priority.

use std::collections::HashSet;

use authn_sync_sdk::{Binding, BindingKind, Resource, ResourceKind};

use super::key_material;
use super::pass::Pass;
use super::priority::{Cutoff, HighWaterMarks};
use super::synthesizer::{login_schema_prefix, policy_prefix};

/// Remove everything of `vserver` above `marks`.
pub async fn reconcile(pass: &mut Pass<'_>, vserver: &str, marks: HighWaterMarks) {
    reconcile_policies(pass, vserver, marks.policy).await;
    reconcile_login_schemas(pass, vserver, marks.login_schema).await;
}

async fn reconcile_policies(pass: &mut Pass<'_>, vserver: &str, cutoff: Cutoff) {
    let prefix = policy_prefix(vserver);
    let mut handled = HashSet::new();

    for binding in stale_bindings(pass, BindingKind::AuthPolicy, vserver, cutoff).await {
        tracing::info!(policy = %binding.target, priority = ?binding.priority, "removing stale authentication policy");
        pass.unbind(&binding).await;
        remove_policy(pass, &binding.target).await;
        handled.insert(binding.target);
    }

    for name in stale_by_name(pass, ResourceKind::AuthPolicy, &prefix, cutoff, &handled).await {
        tracing::info!(policy = %name, "removing unbound stale authentication policy");
        remove_policy(pass, &name).await;
        handled.insert(name);
    }

    for name in stale_by_name(pass, ResourceKind::OAuthAction, &prefix, cutoff, &handled).await {
        tracing::info!(action = %name, "removing orphaned validation action");
        release_action(pass, &name).await;
    }
}

async fn reconcile_login_schemas(pass: &mut Pass<'_>, vserver: &str, cutoff: Cutoff) {
    let prefix = login_schema_prefix(vserver);
    let mut handled = HashSet::new();

    for binding in stale_bindings(pass, BindingKind::LoginSchemaPolicy, vserver, cutoff).await {
        tracing::info!(login_schema = %binding.target, priority = ?binding.priority, "removing stale login schema");
        pass.unbind(&binding).await;
        remove_login_schema(pass, &binding.target).await;
        handled.insert(binding.target);
    }

    for name in
        stale_by_name(pass, ResourceKind::LoginSchemaPolicy, &prefix, cutoff, &handled).await
    {
        tracing::info!(login_schema = %name, "removing unbound stale login schema");
        remove_login_schema(pass, &name).await;
        handled.insert(name);
    }

    for name in stale_by_name(pass, ResourceKind::LoginSchema, &prefix, cutoff, &handled).await {
        tracing::info!(login_schema = %name, "removing orphaned login schema");
        pass.delete(ResourceKind::LoginSchema, &name).await;
    }
}

async fn remove_policy(pass: &mut Pass<'_>, name: &str) {
    pass.delete(ResourceKind::AuthPolicy, name).await;
    release_action(pass, name).await;
}

async fn remove_login_schema(pass: &mut Pass<'_>, name: &str) {
    pass.delete(ResourceKind::LoginSchemaPolicy, name).await;
    pass.delete(ResourceKind::LoginSchema, name).await;
}

async fn stale_bindings(
    pass: &mut Pass<'_>,
    kind: BindingKind,
    vserver: &str,
    cutoff: Cutoff,
) -> Vec<Binding> {
    pass.list_bindings(kind, vserver)
        .await
        .into_iter()
        .filter(|binding| match binding.priority {
            Some(priority) => cutoff.is_stale(priority),
            None => {
                tracing::debug!(%kind, target = %binding.target, "binding without priority, leaving it alone");
                false
            }
        })
        .collect()
}

/// Names of `kind` objects called `<prefix><priority>` with a stale priority,
/// skipping those already handled in this pass.
async fn stale_by_name(
    pass: &mut Pass<'_>,
    kind: ResourceKind,
    prefix: &str,
    cutoff: Cutoff,
    handled: &HashSet<String>,
) -> Vec<String> {
    let mut names: Vec<_> = pass
        .find_all(kind)
        .await
        .unwrap_or_default()
        .iter()
        .map(Resource::name)
        .filter(|name| !handled.contains(*name))
        .filter(|name| name_priority(name, prefix).is_some_and(|p| cutoff.is_stale(p)))
        .map(ToOwned::to_owned)
        .collect();
    names.sort_unstable();
    names
}

/// Priority encoded in `name` after `prefix`, if the rest is all digits.
fn name_priority(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Delete the validation action named like a removed policy and release its
/// key material.
///
/// The lookup only tells which key file to release; the delete happens
/// either way. Bypass policies use a built-in action, so their delete finds
/// nothing and is suppressed.
async fn release_action(pass: &mut Pass<'_>, name: &str) {
    let key_file = match pass.find(ResourceKind::OAuthAction, name).await {
        Some(Resource::OAuthAction(action)) => Some(action.cert_file_name().to_owned()),
        _ => None,
    };
    pass.delete(ResourceKind::OAuthAction, name).await;
    if let Some(key_file) = key_file {
        key_material::release_if_unreferenced(pass, &key_file).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_priority() {
        assert_eq!(name_priority("vs_10", "vs_"), Some(10));
        assert_eq!(name_priority("vs_lgnschm_30", "vs_lgnschm_"), Some(30));
        assert_eq!(name_priority("vs_lgnschm_30", "vs_"), None);
        assert_eq!(name_priority("vs_1_10", "vs_"), None);
        assert_eq!(name_priority("vs_", "vs_"), None);
        assert_eq!(name_priority("vs_+10", "vs_"), None);
        assert_eq!(name_priority("other_10", "vs_"), None);
    }
}
