//! pricecache Storage - Read-Through Price Cache
//!
//! In-memory, process-scoped price cache in front of an upstream
//! [`PriceService`]. Nothing is persisted across restarts.

pub mod cache;

pub use cache::{
    BatchPlan, CacheEntry, CacheRead, CacheStats, FreshnessStore, PriceCache, WorkItem,
};

// Re-export the core contract so callers need a single dependency.
pub use pricecache_core::{
    BlockingPriceService, CacheConfig, CacheError, CacheResult, ConfigError, ItemCode, Price,
    PriceService, ServiceError,
};
