//! Packing of token audiences for the validation action.

use std::collections::HashSet;

use super::capability::AudienceMode;
use super::error::DomainError;

/// Audience representation chosen for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedAudience {
    /// No audience restriction; the action field is unset.
    None,
    /// Comma-separated list in the action field.
    Field(String),
    /// Pattern set named in the action field, one entry per audience.
    PatternSet { name: String, patterns: Vec<String> },
}

impl PackedAudience {
    /// Value for the action's audience field.
    #[must_use]
    pub fn field_value(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Field(value) => Some(value),
            Self::PatternSet { name, .. } => Some(name),
        }
    }
}

/// Pack `audiences` according to `mode`.
///
/// Pattern-set mode names the set `pattern_set_name` and is not length limited.
///
/// # Errors
/// Returns [`DomainError::AudiencePacking`] for empty audience strings, for
/// commas in legacy mode, and when legacy packing keeps nothing although
/// audiences were requested.
pub fn pack(
    audiences: &[String],
    mode: AudienceMode,
    budget: usize,
    pattern_set_name: &str,
) -> Result<PackedAudience, DomainError> {
    if audiences.iter().any(String::is_empty) {
        return Err(DomainError::audience_packing("audience must not be empty"));
    }
    if audiences.is_empty() {
        return Ok(PackedAudience::None);
    }

    match mode {
        AudienceMode::PatternSet => {
            let mut seen = HashSet::new();
            let patterns = audiences
                .iter()
                .filter(|a| seen.insert(a.as_str()))
                .cloned()
                .collect();
            Ok(PackedAudience::PatternSet {
                name: pattern_set_name.to_owned(),
                patterns,
            })
        }
        AudienceMode::LegacySingle | AudienceMode::LegacyMulti => {
            if let Some(bad) = audiences.iter().find(|a| a.contains(',')) {
                return Err(DomainError::audience_packing(format!(
                    "audience '{bad}' contains ',' which the single audience field cannot carry"
                )));
            }
            let packed = pack_legacy(audiences, budget, mode == AudienceMode::LegacyMulti);
            if packed.is_empty() {
                return Err(DomainError::audience_packing(format!(
                    "first audience exceeds the {budget} character audience field"
                )));
            }
            Ok(PackedAudience::Field(packed))
        }
    }
}

/// Greedy packing into one field of at most `budget` characters.
///
/// Each audience after the first also pays for its `,` separator. Packing
/// stops at the first audience that does not fit; later audiences are not
/// tried even if they are shorter. Without `multi_value` only the first
/// audience is kept.
#[must_use]
pub fn pack_legacy(audiences: &[String], budget: usize, multi_value: bool) -> String {
    let mut packed = String::new();
    let mut remaining = budget;

    for (index, audience) in audiences.iter().enumerate() {
        let cost = audience.len() + usize::from(!packed.is_empty());
        if cost > remaining {
            tracing::warn!(
                audience = %audience,
                dropped = audiences.len() - index,
                budget,
                "audience does not fit into the audience field, dropping it and all after it"
            );
            break;
        }
        if !packed.is_empty() {
            packed.push(',');
        }
        packed.push_str(audience);
        remaining -= cost;

        if !multi_value {
            if audiences.len() > 1 {
                tracing::warn!(
                    dropped = audiences.len() - 1,
                    "firmware supports a single audience, keeping only the first"
                );
            }
            break;
        }
    }
    packed
}
