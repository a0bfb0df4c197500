//! Configuration types

use crate::{CacheResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Construction-time options for a price cache.
///
/// ```toml
/// max_age_ms = 60000
/// max_concurrent = 8
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entries older than this are treated as absent and re-fetched.
    #[serde(rename = "max_age_ms", with = "duration_ms")]
    pub max_age: Duration,
    /// Upper bound on simultaneous upstream calls within one batch.
    pub max_concurrent: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(60),
            max_concurrent: 8,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staleness threshold.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the per-batch concurrency ceiling.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Parse and validate a config from TOML.
    pub fn from_toml_str(input: &str) -> CacheResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - max_age > 0
    /// - max_concurrent >= 1
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_age.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "max_age".to_string(),
                value: format!("{:?}", self.max_age),
                reason: "must be positive".to_string(),
            });
        }

        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent".to_string(),
                value: self.max_concurrent.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
