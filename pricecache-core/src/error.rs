//! Error types for pricecache operations

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by an upstream price service.
///
/// The upstream is opaque, so any error type it produces is accepted.
pub type ServiceError = Box<dyn StdError + Send + Sync + 'static>;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all cache errors.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The upstream service failed for `item_code`. No entry was cached.
    #[error("Getting price for {item_code} from service: {source}")]
    Upstream {
        item_code: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Price store lock poisoned")]
    LockPoisoned,

    #[error("Batch admission closed before all items were scheduled")]
    AdmissionClosed,

    /// A batch worker ended without reporting an outcome.
    #[error("Worker for {item_code} terminated without reporting a result")]
    WorkerLost { item_code: String },
}

impl CacheError {
    /// Wrap an upstream failure with the item code that triggered it.
    pub fn upstream(item_code: impl Into<String>, source: ServiceError) -> Self {
        Self::Upstream {
            item_code: item_code.into(),
            source: Arc::from(source),
        }
    }

    /// The item code this error is attributed to, if any.
    pub fn item_code(&self) -> Option<&str> {
        match self {
            Self::Upstream { item_code, .. } | Self::WorkerLost { item_code } => {
                Some(item_code.as_str())
            }
            Self::Config(_) | Self::LockPoisoned | Self::AdmissionClosed => None,
        }
    }

    /// Returns true if the upstream service produced this error.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================
