//! pricecache Test Utilities
//!
//! Centralized test infrastructure for the pricecache workspace:
//! - Scripted mock price service with call accounting
//! - Proptest generators for item-code batches
//! - Fixtures for common price tables

pub use pricecache_core::{
    CacheConfig, CacheError, CacheResult, ItemCode, Price, PriceService, ServiceError,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// MOCK PRICE SERVICE
// ============================================================================

/// What the mock returns for a particular item code.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResult {
    Price(Price),
    Error(String),
}

/// Mock price service for testing.
///
/// Every call is counted (in total and per item), optionally sleeps to
/// simulate an expensive upstream, and tracks how many calls were running at
/// the same time. Unknown item codes produce an error rather than a panic.
#[derive(Debug, Default)]
pub struct MockPriceService {
    results: HashMap<ItemCode, MockResult>,
    call_delay: Duration,
    delay_overrides: HashMap<ItemCode, Duration>,
    calls: AtomicUsize,
    calls_per_item: Mutex<HashMap<ItemCode, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockPriceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful price for `item_code`.
    pub fn with_price(mut self, item_code: impl Into<ItemCode>, price: Price) -> Self {
        self.results.insert(item_code.into(), MockResult::Price(price));
        self
    }

    /// Script a failure for `item_code`.
    pub fn with_error(mut self, item_code: impl Into<ItemCode>, message: impl Into<String>) -> Self {
        self.results
            .insert(item_code.into(), MockResult::Error(message.into()));
        self
    }

    /// How long every call sleeps before answering.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Override the delay for one item code.
    pub fn with_delay_for(mut self, item_code: impl Into<ItemCode>, delay: Duration) -> Self {
        self.delay_overrides.insert(item_code.into(), delay);
        self
    }

    /// Total number of upstream calls.
    pub fn num_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of upstream calls for one item code.
    pub fn calls_for(&self, item_code: &str) -> usize {
        self.calls_per_item
            .lock()
            .map(|calls| calls.get(item_code).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Calls currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn delay_for(&self, item_code: &str) -> Duration {
        self.delay_overrides
            .get(item_code)
            .copied()
            .unwrap_or(self.call_delay)
    }
}

#[async_trait]
impl PriceService for MockPriceService {
    async fn price_for(&self, item_code: &str) -> Result<Price, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls_per_item.lock() {
            *calls.entry(item_code.to_string()).or_insert(0) += 1;
        }

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = self.delay_for(item_code);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.results.get(item_code) {
            Some(MockResult::Price(price)) => Ok(*price),
            Some(MockResult::Error(message)) => Err(message.clone().into()),
            None => Err(format!("no mock result for [{item_code}]").into()),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating item codes and batches.

    use super::*;
    use proptest::prelude::*;

    /// Generate an item code from a small alphabet so batches repeat codes.
    pub fn arb_item_code() -> impl Strategy<Value = ItemCode> {
        (1u8..=8).prop_map(|n| format!("p{n}"))
    }

    /// Generate a batch of item codes, duplicates likely.
    pub fn arb_batch(max_len: usize) -> impl Strategy<Value = Vec<ItemCode>> {
        prop::collection::vec(arb_item_code(), 0..=max_len)
    }

    /// Generate a finite, non-negative price.
    pub fn arb_price() -> impl Strategy<Value = Price> {
        (0u32..1_000_000).prop_map(|cents| f64::from(cents) / 100.0)
    }

    /// Generate a valid concurrency ceiling.
    pub fn arb_max_concurrent() -> impl Strategy<Value = usize> {
        1usize..=8
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made price tables.

    use super::*;

    /// Price of `p{n}` in [`numbered_prices`].
    pub fn numbered_price(n: usize) -> Price {
        n as Price
    }

    /// Mock pricing `p1..=pN` at `1.0..=N`.
    pub fn numbered_prices(count: usize) -> MockPriceService {
        (1..=count).fold(MockPriceService::new(), |service, n| {
            service.with_price(format!("p{n}"), numbered_price(n))
        })
    }

    /// Item codes `p1..=pN`.
    pub fn numbered_codes(count: usize) -> Vec<ItemCode> {
        (1..=count).map(|n| format!("p{n}")).collect()
    }

    /// Config with the given max age and concurrency.
    pub fn config(max_age: Duration, max_concurrent: usize) -> CacheConfig {
        CacheConfig::new()
            .with_max_age(max_age)
            .with_max_concurrent(max_concurrent)
    }
}
