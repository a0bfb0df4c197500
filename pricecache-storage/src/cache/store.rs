//! In-memory price store with staleness tracking.
//!
//! The map lives behind a `std::sync::RwLock`: lookups for different items
//! share the read lock, inserts take the write lock briefly. No guard is ever
//! held across an `.await`, so the store is safe to use from many tokio
//! workers at once.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use pricecache_core::{CacheError, CacheResult, ItemCode, Price, Timestamp};

use super::freshness;

/// A cached price and the time the upstream produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    pub price: Price,
    pub stored_at: Timestamp,
}

impl CacheEntry {
    pub fn new(price: Price, stored_at: Timestamp) -> Self {
        Self { price, stored_at }
    }

    /// Returns true if this entry can still be served at `now`.
    pub fn is_fresh_at(&self, max_age: Duration, now: Timestamp) -> bool {
        freshness::is_fresh(self.stored_at, max_age, now)
    }
}

/// Thread-safe mapping from item code to [`CacheEntry`].
///
/// Growth is unbounded for the life of the process; stale entries stay in
/// the map until they are overwritten or explicitly removed.
#[derive(Debug)]
pub struct FreshnessStore {
    entries: RwLock<HashMap<ItemCode, CacheEntry>>,
    max_age: Duration,
}

impl FreshnessStore {
    /// Create an empty store with the given staleness threshold.
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    fn read(&self) -> CacheResult<RwLockReadGuard<'_, HashMap<ItemCode, CacheEntry>>> {
        self.entries.read().map_err(|_| CacheError::LockPoisoned)
    }

    fn write(&self) -> CacheResult<RwLockWriteGuard<'_, HashMap<ItemCode, CacheEntry>>> {
        self.entries.write().map_err(|_| CacheError::LockPoisoned)
    }

    /// Get the entry for `item_code` if it is fresh right now.
    ///
    /// A stale entry is reported as absent.
    pub fn get_fresh(&self, item_code: &str) -> CacheResult<Option<CacheEntry>> {
        self.get_fresh_at(item_code, Utc::now())
    }

    /// Get the entry for `item_code` if it is fresh at `now`.
    pub fn get_fresh_at(&self, item_code: &str, now: Timestamp) -> CacheResult<Option<CacheEntry>> {
        let entries = self.read()?;
        Ok(entries
            .get(item_code)
            .copied()
            .filter(|entry| entry.is_fresh_at(self.max_age, now)))
    }

    /// Get the raw entry for `item_code`, fresh or not.
    pub fn peek(&self, item_code: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self.read()?.get(item_code).copied())
    }

    /// Store `entry` under `item_code`, replacing any previous entry.
    pub fn insert(&self, item_code: &str, entry: CacheEntry) -> CacheResult<()> {
        self.write()?.insert(item_code.to_owned(), entry);
        Ok(())
    }

    /// Remove the entry for `item_code`. Returns true if one was present.
    pub fn remove(&self, item_code: &str) -> CacheResult<bool> {
        Ok(self.write()?.remove(item_code).is_some())
    }

    /// Remove every entry. Returns the number of entries dropped.
    pub fn clear(&self) -> CacheResult<u64> {
        let mut entries = self.write()?;
        let count = entries.len() as u64;
        entries.clear();
        Ok(count)
    }

    /// Number of entries in the store, fresh or stale.
    pub fn len(&self) -> CacheResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.read()?.is_empty())
    }
}
