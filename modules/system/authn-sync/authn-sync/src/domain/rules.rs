//! Compilation of path match lists into device policy expressions.

use authn_sync_sdk::{AuthRuleMatch, JwtHeader, PathMatch};

use super::error::{DomainError, RuleList};

/// Expression that always matches.
pub const TAUTOLOGY: &str = "true";

/// Policy expressions derived from the include and exclude lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRules {
    /// Rule of the primary (authenticating) policy.
    pub policy_rule: String,
    /// Rule of the bypass policy, when one is needed.
    pub exclude_rule: Option<String>,
}

impl CompiledRules {
    #[must_use]
    pub fn is_tautology(&self) -> bool {
        self.policy_rule == TAUTOLOGY
    }
}

/// Compile include and exclude lists.
///
/// | include | exclude | policy rule       | exclude rule |
/// |---------|---------|-------------------|--------------|
/// | none    | none    | `true`            | none         |
/// | some    | none    | OR(include)       | `true`       |
/// | none    | some    | `(!OR(exclude))`  | OR(exclude)  |
/// | some    | some    | OR(include)       | OR(exclude)  |
///
/// # Errors
/// Returns [`DomainError::InvalidRule`] for rules that cannot be rendered.
pub fn compile(
    include: &[AuthRuleMatch],
    exclude: &[AuthRuleMatch],
) -> Result<CompiledRules, DomainError> {
    let include_rule = render_rules(RuleList::Include, include)?;
    let exclude_rule = render_rules(RuleList::Exclude, exclude)?;

    let compiled = match (include_rule.is_empty(), exclude_rule.is_empty()) {
        (true, true) => CompiledRules {
            policy_rule: TAUTOLOGY.to_owned(),
            exclude_rule: None,
        },
        (false, true) => CompiledRules {
            policy_rule: include_rule,
            exclude_rule: Some(TAUTOLOGY.to_owned()),
        },
        (true, false) => CompiledRules {
            policy_rule: format!("(!{exclude_rule})"),
            exclude_rule: Some(exclude_rule),
        },
        (false, false) => CompiledRules {
            policy_rule: include_rule,
            exclude_rule: Some(exclude_rule),
        },
    };
    Ok(compiled)
}

/// OR of all rules in parentheses; empty string for an empty list.
///
/// # Errors
/// Returns [`DomainError::InvalidRule`] for rules with no populated field,
/// literals containing `"`, or regexes containing `/`.
pub fn render_rules(list: RuleList, rules: &[AuthRuleMatch]) -> Result<String, DomainError> {
    let rendered = rules
        .iter()
        .enumerate()
        .map(|(index, rule)| render_rule(list, index, rule))
        .collect::<Result<Vec<_>, _>>()?;

    if rendered.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("({})", rendered.join(" || ")))
}

fn render_rule(list: RuleList, index: usize, rule: &AuthRuleMatch) -> Result<String, DomainError> {
    let Some(resolved) = rule.resolve() else {
        return Err(DomainError::invalid_rule(
            list,
            index,
            "one of exact, prefix, suffix or regex must be set",
        ));
    };

    let literal = |value: &str| {
        if value.contains('"') {
            Err(DomainError::invalid_rule(
                list,
                index,
                "path must not contain '\"'",
            ))
        } else {
            Ok(())
        }
    };

    match resolved {
        PathMatch::Exact(v) => literal(v).map(|()| format!("HTTP.REQ.URL.EQ(\"{v}\")")),
        PathMatch::Prefix(v) => literal(v).map(|()| format!("HTTP.REQ.URL.STARTSWITH(\"{v}\")")),
        PathMatch::Suffix(v) => literal(v).map(|()| format!("HTTP.REQ.URL.ENDSWITH(\"{v}\")")),
        PathMatch::Regex(v) => {
            if v.contains('/') {
                return Err(DomainError::invalid_rule(
                    list,
                    index,
                    "regex must not contain '/'",
                ));
            }
            Ok(format!("HTTP.REQ.URL.REGEX_MATCH(re/{v}/)"))
        }
    }
}

/// Check that a header or parameter name can be embedded in an expression.
///
/// # Errors
/// Returns [`DomainError::InvalidSpec`] for empty names or names containing `"`.
pub fn validate_name(field: &str, value: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::invalid_spec(field, "must not be empty"));
    }
    validate_literal(field, value)
}

/// Check that a possibly empty value can be embedded in a quoted literal.
///
/// # Errors
/// Returns [`DomainError::InvalidSpec`] for values containing `"`.
pub fn validate_literal(field: &str, value: &str) -> Result<(), DomainError> {
    if value.contains('"') {
        return Err(DomainError::invalid_spec(field, "must not contain '\"'"));
    }
    Ok(())
}

#[must_use]
pub fn header_presence(name: &str) -> String {
    format!("HTTP.REQ.HEADER(\"{name}\").EXISTS")
}

#[must_use]
pub fn param_presence(name: &str) -> String {
    format!("HTTP.REQ.URL.QUERY.VALUE(\"{name}\").LENGTH.GT(0)")
}

/// Presence check restricted to requests the primary policy selects.
#[must_use]
pub fn login_schema_rule(policy_rule: &str, presence: &str) -> String {
    if policy_rule == TAUTOLOGY {
        presence.to_owned()
    } else {
        format!("{policy_rule} && {presence}")
    }
}

/// Expression extracting the token from a header, past its scheme prefix.
#[must_use]
pub fn header_user_expression(header: &JwtHeader) -> String {
    if header.prefix.is_empty() {
        format!("HTTP.REQ.HEADER(\"{}\")", header.name)
    } else {
        format!(
            "HTTP.REQ.HEADER(\"{}\").AFTER_STR(\"{}\")",
            header.name, header.prefix
        )
    }
}

#[must_use]
pub fn param_user_expression(name: &str) -> String {
    format!("HTTP.REQ.URL.QUERY.VALUE(\"{name}\")")
}
