//! Domain models for the authn sync module.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VersionParseError;
use crate::secret::ClientSecret;

/// Declarative authentication intent for one protected entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSpec {
    /// Name of the authentication vserver protecting the entry point.
    pub name: String,
    /// Paths that require authentication.
    pub include_paths: Vec<AuthRuleMatch>,
    /// Paths that bypass authentication.
    pub exclude_paths: Vec<AuthRuleMatch>,
    /// Expected token issuer.
    pub issuer: String,
    /// Raw JWKS document used to verify tokens.
    pub jwks: String,
    /// Accepted token audiences, in order of preference.
    pub audiences: Vec<String>,
    /// Headers that may carry the token.
    pub jwt_headers: Vec<JwtHeader>,
    /// Query parameters that may carry the token.
    pub jwt_params: Vec<String>,
    /// TLS termination for the vserver, handed to the session untouched.
    #[serde(rename = "frontendTLS")]
    pub frontend_tls: Vec<FrontendTls>,
    /// Forward the validated token upstream.
    pub forward: bool,
    /// Header used when forwarding the token.
    pub forward_header: String,
}

/// One path match rule.
///
/// Exactly one field is expected to be populated. When more than one is, the
/// first populated one in the order exact, prefix, suffix, regex wins. Empty
/// strings count as unpopulated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRuleMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

/// A resolved path match rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMatch<'a> {
    Exact(&'a str),
    Prefix(&'a str),
    Suffix(&'a str),
    Regex(&'a str),
}

impl AuthRuleMatch {
    #[must_use]
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            exact: Some(value.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn prefix(value: impl Into<String>) -> Self {
        Self {
            prefix: Some(value.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn suffix(value: impl Into<String>) -> Self {
        Self {
            suffix: Some(value.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn regex(value: impl Into<String>) -> Self {
        Self {
            regex: Some(value.into()),
            ..Self::default()
        }
    }

    /// Resolve the populated variant, applying precedence.
    ///
    /// Returns `None` when no field is populated.
    #[must_use]
    pub fn resolve(&self) -> Option<PathMatch<'_>> {
        fn populated(field: Option<&String>) -> Option<&str> {
            field.map(String::as_str).filter(|s| !s.is_empty())
        }

        populated(self.exact.as_ref())
            .map(PathMatch::Exact)
            .or_else(|| populated(self.prefix.as_ref()).map(PathMatch::Prefix))
            .or_else(|| populated(self.suffix.as_ref()).map(PathMatch::Suffix))
            .or_else(|| populated(self.regex.as_ref()).map(PathMatch::Regex))
    }
}

/// Header that may carry a token, with an optional scheme prefix such as `Bearer `.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtHeader {
    pub name: String,
    pub prefix: String,
}

impl JwtHeader {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
        }
    }

    #[must_use]
    pub fn with_prefix(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
        }
    }
}

/// TLS termination material for a vserver. Not interpreted by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontendTls {
    pub cert_file: String,
    pub key_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cert_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

/// `major.minor` number as reported by the device, e.g. release `13.0` or build `41.10`.
///
/// Components compare numerically, so build `41.10` is newer than `41.9`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
}

impl VersionNumber {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for VersionNumber {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError {
            input: s.to_owned(),
        };
        let trimmed = s.trim();
        let (major, minor) = trimmed.split_once('.').unwrap_or((trimmed, "0"));
        let major = major.parse::<u32>().map_err(|_| invalid())?;
        let minor = minor.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { major, minor })
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for VersionNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Release and build of the device firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceVersion {
    pub release: VersionNumber,
    pub build: VersionNumber,
}

impl DeviceVersion {
    #[must_use]
    pub const fn new(release: VersionNumber, build: VersionNumber) -> Self {
        Self { release, build }
    }
}

impl fmt::Display for DeviceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} build {}", self.release, self.build)
    }
}

/// Kinds of named objects the engine manages on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    AuthVserver,
    OAuthAction,
    AuthPolicy,
    LoginSchema,
    LoginSchemaPolicy,
    PatternSet,
    CsVserver,
}

impl ResourceKind {
    /// Device-side type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthVserver => "authenticationvserver",
            Self::OAuthAction => "authenticationoauthaction",
            Self::AuthPolicy => "authenticationpolicy",
            Self::LoginSchema => "authenticationloginschema",
            Self::LoginSchemaPolicy => "authenticationloginschemapolicy",
            Self::PatternSet => "policypatset",
            Self::CsVserver => "csvserver",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication vserver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthVserver {
    pub name: String,
    pub service_type: String,
    pub ipv46: String,
}

/// OAuth validation action: verifies issuer, signature and audience of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthAction {
    pub name: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: ClientSecret,
    pub issuer: String,
    pub cert_file_path: String,
    /// Comma-separated audiences, or the name of a pattern set.
    pub audience: Option<String>,
}

impl OAuthAction {
    /// Last segment of [`cert_file_path`](Self::cert_file_path).
    #[must_use]
    pub fn cert_file_name(&self) -> &str {
        self.cert_file_path
            .rsplit_once('/')
            .map_or(self.cert_file_path.as_str(), |(_, file)| file)
    }
}

/// Authentication or login-schema policy: a rule selecting an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub rule: String,
    pub action: String,
}

/// Describes how to extract the credential from a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSchema {
    pub name: String,
    pub authentication_schema: String,
    pub user_expression: String,
}

/// Named collection of string patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    pub name: String,
}

/// Authentication attachment of a content-switching vserver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsVserverAuth {
    pub name: String,
    pub authn_401: bool,
    pub authn_vserver: String,
}

/// A named object on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    AuthVserver(AuthVserver),
    OAuthAction(OAuthAction),
    AuthPolicy(Policy),
    LoginSchema(LoginSchema),
    LoginSchemaPolicy(Policy),
    PatternSet(PatternSet),
    CsVserver(CsVserverAuth),
}

impl Resource {
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::AuthVserver(_) => ResourceKind::AuthVserver,
            Self::OAuthAction(_) => ResourceKind::OAuthAction,
            Self::AuthPolicy(_) => ResourceKind::AuthPolicy,
            Self::LoginSchema(_) => ResourceKind::LoginSchema,
            Self::LoginSchemaPolicy(_) => ResourceKind::LoginSchemaPolicy,
            Self::PatternSet(_) => ResourceKind::PatternSet,
            Self::CsVserver(_) => ResourceKind::CsVserver,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::AuthVserver(v) => &v.name,
            Self::OAuthAction(a) => &a.name,
            Self::AuthPolicy(p) | Self::LoginSchemaPolicy(p) => &p.name,
            Self::LoginSchema(s) => &s.name,
            Self::PatternSet(p) => &p.name,
            Self::CsVserver(c) => &c.name,
        }
    }
}

/// Resource fields that can be reset to their device default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// `audience` of a validation action.
    Audience,
    /// `authn401` of a cs vserver.
    Authn401,
    /// `authnvsname` of a cs vserver.
    AuthnVsName,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audience => "audience",
            Self::Authn401 => "authn401",
            Self::AuthnVsName => "authnvsname",
        }
    }
}

/// Kinds of bindings the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// Authentication policy bound to an auth vserver.
    AuthPolicy,
    /// Login-schema policy bound to an auth vserver.
    LoginSchemaPolicy,
    /// Pattern string bound to a pattern set.
    PatternSetEntry,
}

impl BindingKind {
    /// Device-side type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthPolicy => "authenticationvserver_authenticationpolicy_binding",
            Self::LoginSchemaPolicy => {
                "authenticationvserver_authenticationloginschemapolicy_binding"
            }
            Self::PatternSetEntry => "policypatset_pattern_binding",
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attachment of a policy or pattern to an owner object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub kind: BindingKind,
    /// Vserver or pattern set name.
    pub owner: String,
    /// Policy name, or the pattern string for pattern set entries.
    pub target: String,
    /// Evaluation priority. Pattern set entries have none.
    pub priority: Option<u32>,
}

impl Binding {
    #[must_use]
    pub fn policy(kind: BindingKind, owner: &str, policy: &str, priority: u32) -> Self {
        Self {
            kind,
            owner: owner.to_owned(),
            target: policy.to_owned(),
            priority: Some(priority),
        }
    }

    #[must_use]
    pub fn pattern(pattern_set: &str, pattern: &str) -> Self {
        Self {
            kind: BindingKind::PatternSetEntry,
            owner: pattern_set.to_owned(),
            target: pattern.to_owned(),
            priority: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_precedence() {
        let rule = AuthRuleMatch {
            exact: Some(String::new()),
            prefix: Some("/p".to_owned()),
            suffix: Some("/s".to_owned()),
            regex: None,
        };
        assert_eq!(rule.resolve(), Some(PathMatch::Prefix("/p")));

        let rule = AuthRuleMatch {
            exact: Some("/e".to_owned()),
            regex: Some("x".to_owned()),
            ..AuthRuleMatch::default()
        };
        assert_eq!(rule.resolve(), Some(PathMatch::Exact("/e")));
        assert_eq!(AuthRuleMatch::default().resolve(), None);
    }

    #[test]
    fn test_version_number_ordering_is_numeric() {
        let a: VersionNumber = "41.10".parse().unwrap();
        let b: VersionNumber = "41.9".parse().unwrap();
        assert!(a > b);
        assert_eq!("13".parse::<VersionNumber>().unwrap(), VersionNumber::new(13, 0));
        assert!("13.x".parse::<VersionNumber>().is_err());
        assert_eq!(a.to_string(), "41.10");
    }

    #[test]
    fn test_auth_spec_deserializes_camel_case() {
        let spec: AuthSpec = serde_json::from_value(serde_json::json!({
            "name": "cs1authn",
            "includePaths": [{ "prefix": "/api" }],
            "jwtHeaders": [{ "name": "Authorization", "prefix": "Bearer " }],
            "jwtParams": ["token"],
            "frontendTLS": [{ "certFile": "c.pem", "keyFile": "k.pem" }]
        }))
        .unwrap();
        assert_eq!(spec.include_paths[0].resolve(), Some(PathMatch::Prefix("/api")));
        assert_eq!(spec.jwt_headers[0].prefix, "Bearer ");
        assert_eq!(spec.jwt_params, vec!["token"]);
        assert_eq!(spec.frontend_tls.len(), 1);
        assert!(spec.exclude_paths.is_empty());
    }

    #[test]
    fn test_cert_file_name_and_redacted_debug() {
        let action = OAuthAction {
            name: "a_10".to_owned(),
            authorization_endpoint: String::new(),
            token_endpoint: String::new(),
            client_id: "id".to_owned(),
            client_secret: ClientSecret::new("hunter2"),
            issuer: String::new(),
            cert_file_path: "/nsconfig/ssl/jwks_abc".to_owned(),
            audience: None,
        };
        assert_eq!(action.cert_file_name(), "jwks_abc");
        assert!(!format!("{action:?}").contains("hunter2"));
    }
}
