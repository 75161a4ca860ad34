//! Content-addressed storage of JWKS key material.
//!
//! A payload is stored under a name derived from its SHA-256 digest, so equal
//! payloads share one file no matter how many auth vservers use them. A file
//! is removed only once no validation action points at it any more.

use authn_sync_sdk::{Resource, ResourceKind, messages};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use super::error::DomainError;
use super::faults::{Action, Operation};
use super::pass::Pass;

pub const CONTENT_NAME_PREFIX: &str = "jwks_";

/// Hex digits that must survive truncation (128 bits).
pub const MIN_DIGEST_DIGITS: usize = 32;

/// Deterministic file name for `payload`, at most `max_len` characters.
///
/// The name is the prefix followed by the hex digest, truncated from the end.
/// With at least [`MIN_DIGEST_DIGITS`] digits left, two distinct payloads
/// sharing a name is not a practical concern; equal payloads always do.
///
/// # Errors
/// Returns [`DomainError::InvalidConfig`] if `max_len` leaves fewer than
/// [`MIN_DIGEST_DIGITS`] digits.
pub fn content_name(payload: &[u8], max_len: usize) -> Result<String, DomainError> {
    let digits = max_len.saturating_sub(CONTENT_NAME_PREFIX.len());
    if digits < MIN_DIGEST_DIGITS {
        return Err(DomainError::invalid_config(format!(
            "content_name_max_len {max_len} leaves fewer than {MIN_DIGEST_DIGITS} digest digits"
        )));
    }
    let mut digest = hex::encode(Sha256::digest(payload));
    digest.truncate(digits);
    Ok(format!("{CONTENT_NAME_PREFIX}{digest}"))
}

/// Device path of a stored file.
#[must_use]
pub fn file_path(cert_dir: &str, name: &str) -> String {
    format!("{cert_dir}{name}")
}

/// Upload `payload` under `name` unless the file is already present.
pub async fn ensure(pass: &mut Pass<'_>, name: &str, payload: &[u8]) {
    let exists = pass.content.exists(name).await;
    let Some(exists) = pass
        .faults
        .record(Operation::file(Action::Find, name), exists, &[])
    else {
        return;
    };
    if exists {
        tracing::debug!(file = name, "key material already present");
        return;
    }

    tracing::debug!(file = name, "uploading key material");
    let encoded = STANDARD.encode(payload);
    let result = pass.content.upload(name, &encoded).await;
    pass.faults.record(
        Operation::file(Action::Upload, name),
        result,
        &[messages::RESOURCE_EXISTS],
    );
}

/// Remove the file `name` if no remaining validation action references it.
///
/// When the actions cannot be listed the file is kept.
pub async fn release_if_unreferenced(pass: &mut Pass<'_>, name: &str) {
    let Some(actions) = pass.find_all(ResourceKind::OAuthAction).await else {
        return;
    };
    let referenced = actions.iter().any(|resource| {
        matches!(resource, Resource::OAuthAction(action) if action.cert_file_name() == name)
    });
    if referenced {
        tracing::debug!(file = name, "key material still referenced, keeping it");
        return;
    }

    tracing::debug!(file = name, "removing unreferenced key material");
    let result = pass.content.remove(name).await;
    pass.faults.record(
        Operation::file(Action::Remove, name),
        result,
        &[messages::NO_SUCH_RESOURCE],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_name_is_deterministic_and_bounded() {
        let a = content_name(b"{\"keys\":[]}", 127).unwrap();
        let b = content_name(b"{\"keys\":[]}", 127).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with(CONTENT_NAME_PREFIX));
        // full sha256 fits: prefix + 64 hex digits
        assert_eq!(a.len(), CONTENT_NAME_PREFIX.len() + 64);
        assert_ne!(a, content_name(b"{\"keys\":[1]}", 127).unwrap());
    }

    #[test]
    fn test_content_name_truncates() {
        let full = content_name(b"payload", 127).unwrap();
        let short = content_name(b"payload", 40).unwrap();
        assert_eq!(short.len(), 40);
        assert!(full.starts_with(&short));
    }

    #[test]
    fn test_content_name_rejects_too_short_bound() {
        let max_len = CONTENT_NAME_PREFIX.len() + MIN_DIGEST_DIGITS - 1;
        assert!(matches!(
            content_name(b"payload", max_len),
            Err(DomainError::InvalidConfig { .. })
        ));
        assert!(content_name(b"payload", max_len + 1).is_ok());
    }

    #[test]
    fn test_file_path() {
        assert_eq!(file_path("/nsconfig/ssl/", "jwks_ab"), "/nsconfig/ssl/jwks_ab");
    }
}
