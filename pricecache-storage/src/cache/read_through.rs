//! Read-through price cache.
//!
//! Single-item resolution: serve a fresh entry from the store, otherwise call
//! the upstream service and cache the result. Batch resolution built on top
//! of this lives in [`super::batch`].

use std::sync::Arc;

use chrono::Utc;
use pricecache_core::{CacheConfig, CacheError, CacheResult, Price, PriceService};
use tracing::{debug, warn};

use super::freshness::CacheRead;
use super::stats::{CacheStats, StatsRecorder};
use super::store::{CacheEntry, FreshnessStore};

/// Read-through cache in front of a [`PriceService`].
///
/// Cloning is cheap: clones share the same store, statistics and upstream
/// service.
///
/// # Example
///
/// ```ignore
/// let cache = PriceCache::new(Arc::new(service), CacheConfig::default())?;
///
/// let price = cache.resolve_one("p1").await?;
/// let prices = cache.resolve_all(&["p1", "p2", "p1"]).await?;
/// ```
pub struct PriceCache<S: ?Sized> {
    /// The upstream price service.
    pub(crate) service: Arc<S>,
    /// Cached prices.
    pub(crate) store: Arc<FreshnessStore>,
    /// Hit/miss counters.
    pub(crate) stats: Arc<StatsRecorder>,
    /// Cache configuration.
    pub(crate) config: CacheConfig,
}

impl<S> PriceCache<S>
where
    S: PriceService + ?Sized + 'static,
{
    /// Create a new read-through cache. Fails if `config` is invalid.
    pub fn new(service: Arc<S>, config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self {
            service,
            store: Arc::new(FreshnessStore::new(config.max_age)),
            stats: Arc::new(StatsRecorder::default()),
            config,
        })
    }

    /// Create a new read-through cache with default configuration.
    pub fn with_defaults(service: Arc<S>) -> CacheResult<Self> {
        Self::new(service, CacheConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the price store.
    pub fn store(&self) -> &FreshnessStore {
        &self.store
    }

    /// Get a reference to the upstream service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Get the price for an item along with hit/miss and age metadata.
    pub async fn lookup(&self, item_code: &str) -> CacheResult<CacheRead<Price>> {
        if let Some(entry) = self.store.get_fresh(item_code)? {
            self.stats.record_hit();
            debug!(item_code, "Price cache hit");
            return Ok(CacheRead::from_cache(entry.price, entry.stored_at));
        }

        self.stats.record_miss();
        debug!(item_code, "Price cache miss, fetching from service");
        self.fetch_and_cache(item_code).await
    }

    /// Get the price for an item, either from the cache or from the service
    /// if it was not cached or too old.
    pub async fn resolve_one(&self, item_code: &str) -> CacheResult<Price> {
        self.lookup(item_code).await.map(CacheRead::into_value)
    }

    /// Fetch from the service and update the store.
    async fn fetch_and_cache(&self, item_code: &str) -> CacheResult<CacheRead<Price>> {
        self.stats.record_upstream_call();
        let price = match self.service.price_for(item_code).await {
            Ok(price) => price,
            Err(source) => {
                self.stats.record_upstream_failure();
                warn!(item_code, error = %source, "Price service lookup failed");
                return Err(CacheError::upstream(item_code, source));
            }
        };

        let stored_at = Utc::now();
        self.store
            .insert(item_code, CacheEntry::new(price, stored_at))?;
        Ok(CacheRead::from_service(price, stored_at))
    }

    /// Drop the cached price for a single item.
    pub fn invalidate(&self, item_code: &str) -> CacheResult<bool> {
        self.store.remove(item_code)
    }

    /// Drop every cached price.
    pub fn clear(&self) -> CacheResult<u64> {
        self.store.clear()
    }

    /// Snapshot of cache usage counters.
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let entry_count = self.store.len()? as u64;
        Ok(self.stats.snapshot(entry_count))
    }
}

impl<S: ?Sized> Clone for PriceCache<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
            config: self.config.clone(),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for PriceCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceCache")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pricecache_core::ServiceError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // Mock price service for testing
    #[derive(Default)]
    struct MockPriceService {
        prices: HashMap<String, Result<Price, String>>,
        calls: AtomicUsize,
    }

    impl MockPriceService {
        fn with_price(mut self, item_code: &str, price: Price) -> Self {
            self.prices.insert(item_code.to_string(), Ok(price));
            self
        }

        fn with_error(mut self, item_code: &str, message: &str) -> Self {
            self.prices
                .insert(item_code.to_string(), Err(message.to_string()));
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceService for MockPriceService {
        async fn price_for(&self, item_code: &str) -> Result<Price, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.prices.get(item_code) {
                Some(Ok(price)) => Ok(*price),
                Some(Err(message)) => Err(message.clone().into()),
                None => Err(format!("no price for {item_code}").into()),
            }
        }
    }

    fn cache_with(service: MockPriceService, max_age: Duration) -> PriceCache<MockPriceService> {
        let config = CacheConfig::new().with_max_age(max_age).with_max_concurrent(5);
        PriceCache::new(Arc::new(service), config).unwrap()
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_from_service() {
        let cache = cache_with(
            MockPriceService::default().with_price("p1", 5.0),
            Duration::from_secs(60),
        );

        let read = cache.lookup("p1").await.unwrap();
        assert!(read.was_cache_miss());
        assert_eq!(read.into_value(), 5.0);
        assert_eq!(cache.service().calls(), 1);
    }

    #[tokio::test]
    async fn test_second_lookup_is_a_hit() {
        let cache = cache_with(
            MockPriceService::default().with_price("p1", 5.0),
            Duration::from_secs(60),
        );

        cache.lookup("p1").await.unwrap();
        let read = cache.lookup("p1").await.unwrap();
        assert!(read.was_cache_hit());
        assert_eq!(cache.service().calls(), 1);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.upstream_calls, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_service_error_is_wrapped_and_not_cached() {
        let cache = cache_with(
            MockPriceService::default().with_error("p1", "some error"),
            Duration::from_secs(60),
        );

        let err = cache.resolve_one("p1").await.unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(err.item_code(), Some("p1"));
        assert!(err.to_string().contains("some error"));
        assert!(cache.store().peek("p1").unwrap().is_none());

        // A failed lookup is retried on the next call.
        assert!(cache.resolve_one("p1").await.is_err());
        assert_eq!(cache.service().calls(), 2);
        assert_eq!(cache.stats().unwrap().upstream_failures, 2);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let cache = cache_with(
            MockPriceService::default().with_price("p1", 5.0),
            Duration::from_millis(50),
        );

        cache.resolve_one("p1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let read = cache.lookup("p1").await.unwrap();

        assert!(read.was_cache_miss());
        assert_eq!(cache.service().calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = cache_with(
            MockPriceService::default().with_price("p1", 5.0),
            Duration::from_secs(60),
        );

        cache.resolve_one("p1").await.unwrap();
        assert!(cache.invalidate("p1").unwrap());
        cache.resolve_one("p1").await.unwrap();
        assert_eq!(cache.service().calls(), 2);

        assert_eq!(cache.clear().unwrap(), 1);
        assert_eq!(cache.stats().unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_clones_share_store() {
        let cache = cache_with(
            MockPriceService::default().with_price("p1", 5.0),
            Duration::from_secs(60),
        );
        let clone = cache.clone();

        cache.resolve_one("p1").await.unwrap();
        assert!(clone.lookup("p1").await.unwrap().was_cache_hit());
        assert_eq!(clone.service().calls(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CacheConfig::new().with_max_concurrent(0);
        let result = PriceCache::new(Arc::new(MockPriceService::default()), config);
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
