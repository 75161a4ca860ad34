//! Configuration for the in-memory device plugin.

use authn_sync_sdk::{DeviceVersion, VersionNumber};
use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InMemoryDeviceConfig {
    /// Firmware release reported by the simulated device.
    pub release: VersionNumber,

    /// Firmware build reported by the simulated device.
    pub build: VersionNumber,
}

impl Default for InMemoryDeviceConfig {
    fn default() -> Self {
        Self {
            release: VersionNumber::new(13, 0),
            build: VersionNumber::new(41, 10),
        }
    }
}

impl InMemoryDeviceConfig {
    #[must_use]
    pub fn version(&self) -> DeviceVersion {
        DeviceVersion::new(self.release, self.build)
    }
}
