//! Configuration types for chatlog.
//!
//! `MemoryConfig` represents the `config.toml` that controls index
//! provisioning. All fields have defaults.

use serde::{Deserialize, Serialize};

use std::time::Duration;

use crate::error::ConfigError;

/// Index provisioning settings.
///
/// ```toml
/// create-indexes = true
/// ttl = 86400   # seconds, 0 disables expiry
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MemoryConfig {
    /// Run index initialization at startup.
    #[serde(default)]
    pub create_indexes: bool,

    /// Age after which records expire. Zero means no expiry.
    #[serde(default, with = "ttl_seconds")]
    pub ttl: Duration,
}

impl MemoryConfig {
    pub fn ttl_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Expiry is catalogued in whole seconds, so a non-zero TTL must be too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_enabled() && self.ttl.subsec_nanos() != 0 {
            return Err(ConfigError::InvalidTtl(format!(
                "{:?} is not a whole number of seconds",
                self.ttl
            )));
        }
        Ok(())
    }
}

mod ttl_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(ttl.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
