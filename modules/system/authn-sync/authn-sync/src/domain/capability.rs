//! Firmware capability resolution.
//!
//! The device version is queried once per pass and turned into a
//! [`DeviceCapabilities`] value; nothing downstream compares versions.

use authn_sync_sdk::{DeviceVersion, VersionNumber};
use serde::Deserialize;

/// How token audiences are expressed on the validation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceMode {
    /// Single length-limited field holding exactly one audience.
    LegacySingle,
    /// Single length-limited field holding a comma-separated list.
    LegacyMulti,
    /// Field names a pattern set with one entry per audience.
    PatternSet,
}

/// One row of the capability table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityRule {
    /// Release the rule applies to; matched exactly.
    pub release: VersionNumber,
    /// Lowest build within that release enabling the mode.
    pub min_build: VersionNumber,
    pub audience_mode: AudienceMode,
}

impl CapabilityRule {
    fn matches(&self, version: DeviceVersion) -> bool {
        version.release == self.release && version.build >= self.min_build
    }
}

/// Behaviour switches derived from the device version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub audience_mode: AudienceMode,
}

impl DeviceCapabilities {
    /// Resolve against `rules`; first match wins, otherwise single-value legacy.
    #[must_use]
    pub fn resolve(version: DeviceVersion, rules: &[CapabilityRule]) -> Self {
        let audience_mode = rules
            .iter()
            .find(|rule| rule.matches(version))
            .map_or(AudienceMode::LegacySingle, |rule| rule.audience_mode);
        Self { audience_mode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_capability_rules;

    fn version(release: &str, build: &str) -> DeviceVersion {
        DeviceVersion::new(release.parse().unwrap(), build.parse().unwrap())
    }

    fn mode(release: &str, build: &str) -> AudienceMode {
        DeviceCapabilities::resolve(version(release, build), &default_capability_rules())
            .audience_mode
    }

    #[test]
    fn test_pattern_set_threshold() {
        assert_eq!(mode("13.0", "41.10"), AudienceMode::PatternSet);
        assert_eq!(mode("13.0", "47.22"), AudienceMode::PatternSet);
        assert_eq!(mode("13.0", "41.9"), AudienceMode::LegacyMulti);
    }

    #[test]
    fn test_legacy_multi_thresholds() {
        assert_eq!(mode("13.0", "38.15"), AudienceMode::LegacyMulti);
        assert_eq!(mode("12.1", "53.3"), AudienceMode::LegacyMulti);
        assert_eq!(mode("12.1", "55.18"), AudienceMode::LegacyMulti);
    }

    #[test]
    fn test_everything_else_is_single_value() {
        assert_eq!(mode("13.0", "38.9"), AudienceMode::LegacySingle);
        assert_eq!(mode("12.1", "52.15"), AudienceMode::LegacySingle);
        assert_eq!(mode("12.0", "60.1"), AudienceMode::LegacySingle);
        assert_eq!(mode("13.1", "12.1"), AudienceMode::LegacySingle);
    }

    #[test]
    fn test_empty_table_defaults_to_single_value() {
        let caps = DeviceCapabilities::resolve(version("13.0", "41.10"), &[]);
        assert_eq!(caps.audience_mode, AudienceMode::LegacySingle);
    }
}
