//! pricecache Core - Shared Types
//!
//! Identity aliases, the upstream price service contract, cache
//! configuration and the error taxonomy. All other crates depend on this.

use chrono::{DateTime, Utc};

pub mod config;
pub mod error;
pub mod service;

pub use config::CacheConfig;
pub use error::{CacheError, CacheResult, ConfigError, ServiceError};
pub use service::{BlockingPriceService, PriceService};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Item code identifying a priced item (e.g. `"p1"`).
pub type ItemCode = String;

/// Price returned by the upstream service.
pub type Price = f64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
