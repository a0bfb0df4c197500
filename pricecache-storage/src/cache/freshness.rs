//! Freshness contracts for cache reads.
//!
//! An entry is fresh while its age is strictly below the configured
//! `max_age`. Staleness is evaluated on every read; nothing sweeps old
//! entries in the background.

use std::time::Duration;

use chrono::Utc;
use pricecache_core::Timestamp;

/// Age of a value stored at `stored_at`, observed at `now`.
///
/// A `stored_at` in the future (clock skew) counts as zero age.
pub fn age_at(stored_at: Timestamp, now: Timestamp) -> Duration {
    now.signed_duration_since(stored_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Returns true if a value stored at `stored_at` is still usable at `now`.
pub fn is_fresh(stored_at: Timestamp, max_age: Duration, now: Timestamp) -> bool {
    age_at(stored_at, now) < max_age
}

/// Result of a cache read, carrying staleness metadata.
///
/// This wrapper lets callers see whether a price came from the cache or
/// from the upstream service, and how old it is.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    /// The resolved value.
    value: T,
    /// When the upstream call that produced this value returned.
    stored_at: Timestamp,
    /// Whether this was a cache hit or miss.
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, stored_at: Timestamp) -> Self {
        Self {
            value,
            stored_at,
            was_cache_hit: true,
        }
    }

    /// Create a new cache read from an upstream fetch (cache miss).
    pub fn from_service(value: T, stored_at: Timestamp) -> Self {
        Self {
            value,
            stored_at,
            was_cache_hit: false,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Check if the data was produced at or after the given timestamp.
    pub fn is_fresh_as_of(&self, timestamp: Timestamp) -> bool {
        self.stored_at >= timestamp
    }

    /// How long ago the upstream produced this value.
    pub fn age(&self) -> Duration {
        age_at(self.stored_at, Utc::now())
    }

    /// Get when this value was fetched from the upstream.
    pub fn stored_at(&self) -> Timestamp {
        self.stored_at
    }

    /// Check if this was a cache hit.
    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    /// Check if this was a cache miss (fetched from the service).
    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            stored_at: self.stored_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_below_max_age() {
        let now = Utc::now();
        let stored_at = now - chrono::Duration::milliseconds(100);
        assert!(is_fresh(stored_at, Duration::from_millis(200), now));
    }

    #[test]
    fn test_stale_at_exact_max_age() {
        let now = Utc::now();
        let stored_at = now - chrono::Duration::milliseconds(200);
        assert!(!is_fresh(stored_at, Duration::from_millis(200), now));
    }

    #[test]
    fn test_stale_past_max_age() {
        let now = Utc::now();
        let stored_at = now - chrono::Duration::seconds(5);
        assert!(!is_fresh(stored_at, Duration::from_secs(1), now));
    }

    #[test]
    fn test_future_timestamp_has_zero_age() {
        let now = Utc::now();
        let stored_at = now + chrono::Duration::seconds(5);
        assert_eq!(age_at(stored_at, now), Duration::ZERO);
        assert!(is_fresh(stored_at, Duration::from_millis(1), now));
    }

    #[test]
    fn test_cache_read_from_cache() {
        let stored_at = Utc::now();
        let read = CacheRead::from_cache(5.0, stored_at);

        assert!(read.was_cache_hit());
        assert!(!read.was_cache_miss());
        assert_eq!(*read.value(), 5.0);
        assert_eq!(read.stored_at(), stored_at);
    }

    #[test]
    fn test_cache_read_from_service() {
        let read = CacheRead::from_service(7.0, Utc::now());

        assert!(!read.was_cache_hit());
        assert!(read.was_cache_miss());
        assert_eq!(read.into_value(), 7.0);
    }

    #[test]
    fn test_cache_read_age() {
        let past = Utc::now() - chrono::Duration::seconds(5);
        let read = CacheRead::from_cache(1.0, past);

        let age = read.age();
        assert!(age >= Duration::from_secs(4));
        assert!(age <= Duration::from_secs(10));
    }

    #[test]
    fn test_cache_read_is_fresh_as_of() {
        let stored_at = Utc::now();
        let read = CacheRead::from_cache(1.0, stored_at);

        assert!(read.is_fresh_as_of(stored_at - chrono::Duration::seconds(10)));
        assert!(read.is_fresh_as_of(stored_at));
        assert!(!read.is_fresh_as_of(stored_at + chrono::Duration::seconds(10)));
    }

    #[test]
    fn test_cache_read_map() {
        let read = CacheRead::from_service(42.5f64, Utc::now());
        let mapped = read.map(|v| v.to_string());

        assert!(mapped.was_cache_miss());
        assert_eq!(mapped.into_value(), "42.5");
    }
}
