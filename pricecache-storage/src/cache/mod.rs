//! Read-through price cache with freshness tracking.
//!
//! This module fronts a slow, fallible [`PriceService`](pricecache_core::PriceService)
//! with time-bounded memoization and a batch path that resolves many item
//! codes over a bounded number of concurrent upstream calls.
//!
//! # Freshness
//!
//! An entry is served only while `now - stored_at < max_age`. Older entries
//! are treated as absent and trigger a fresh upstream call; they are never
//! swept in the background.
//!
//! # Batches
//!
//! [`PriceCache::resolve_all`] deduplicates the requested item codes,
//! resolves each distinct code once with at most `max_concurrent` calls in
//! flight, and returns prices in request order. A batch is all-or-nothing:
//! the first upstream error is returned and no prices are.
//!
//! # Example
//!
//! ```ignore
//! let cache = PriceCache::new(Arc::new(service), CacheConfig::default())?;
//!
//! let prices = cache.resolve_all(&["p1", "p2", "p3", "p1", "p3"]).await?;
//! assert_eq!(prices.len(), 5);
//!
//! let read = cache.lookup("p1").await?;
//! assert!(read.was_cache_hit());
//! ```

pub mod batch;
pub mod freshness;
pub mod read_through;
pub mod stats;
pub mod store;

pub use batch::{BatchPlan, WorkItem};
pub use freshness::CacheRead;
pub use read_through::PriceCache;
pub use stats::CacheStats;
pub use store::{CacheEntry, FreshnessStore};
