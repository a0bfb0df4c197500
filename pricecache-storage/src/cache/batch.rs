//! Bounded-parallel batch resolution.
//!
//! A batch is planned once: every distinct item code becomes a single work
//! item that remembers the output positions it fills. Work items run as
//! tokio tasks gated by a per-batch semaphore, report one tagged outcome each
//! to a single collector, and the collector assembles the ordered result.
//!
//! ```text
//!   item codes ──► BatchPlan (dedup) ──► admission (Semaphore, max_concurrent)
//!                                              │
//!                                     ┌────────┴────────┐
//!                                  worker ... worker  (resolve_one)
//!                                     └────────┬────────┘
//!                                              ▼
//!                               collector (mpsc) ──► ordered prices
//! ```
//!
//! The first error stops admission and is returned immediately. Workers
//! already running are left to finish on their own: they still populate the
//! store, but their outcomes are dropped with the receiver.

use std::collections::HashMap;
use std::sync::Arc;

use pricecache_core::{CacheError, CacheResult, ItemCode, Price, PriceService};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace, warn, Instrument};

use super::read_through::PriceCache;

/// One distinct item code in a batch and every position it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub item_code: ItemCode,
    pub positions: Vec<usize>,
}

/// Deduplicated schedule for a batch request.
///
/// Work items are kept in first-seen order, which fixes the order in which
/// they are admitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    items: Vec<WorkItem>,
    requested: usize,
}

impl BatchPlan {
    /// Build a plan from the requested item codes, duplicates included.
    pub fn new<K: AsRef<str>>(item_codes: &[K]) -> Self {
        let mut items: Vec<WorkItem> = Vec::new();
        let mut index_of: HashMap<&str, usize> = HashMap::new();

        for (position, item_code) in item_codes.iter().enumerate() {
            let item_code = item_code.as_ref();
            let index = *index_of.entry(item_code).or_insert_with(|| {
                items.push(WorkItem {
                    item_code: item_code.to_owned(),
                    positions: Vec::new(),
                });
                items.len() - 1
            });
            items[index].positions.push(position);
        }

        Self {
            items,
            requested: item_codes.len(),
        }
    }

    /// Distinct work items in admission order.
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Number of positions in the output, duplicates included.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Number of distinct item codes.
    pub fn unique(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requested == 0
    }
}

/// Outcome reported by a worker, tagged with its work item index.
#[derive(Debug)]
struct Outcome {
    index: usize,
    result: CacheResult<Price>,
}

impl<S> PriceCache<S>
where
    S: PriceService + ?Sized + 'static,
{
    /// Get the prices for several items at once.
    ///
    /// Each distinct item code is resolved exactly once, with at most
    /// `max_concurrent` resolutions in flight. The returned prices match
    /// `item_codes` position for position. If any resolution fails, that
    /// error is returned and no prices are.
    pub async fn resolve_all<K: AsRef<str>>(&self, item_codes: &[K]) -> CacheResult<Vec<Price>> {
        let plan = BatchPlan::new(item_codes);
        if plan.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            requested = plan.requested(),
            unique = plan.unique(),
            max_concurrent = self.config.max_concurrent,
            "Resolving price batch"
        );

        let slots = Arc::new(Semaphore::new(
            self.config.max_concurrent.min(Semaphore::MAX_PERMITS),
        ));
        // Every worker sends exactly once, so sends never wait for capacity.
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<Outcome>(plan.unique());
        let mut outcome_tx = Some(outcome_tx);

        let mut prices = vec![0.0; plan.requested()];
        let mut reported = vec![false; plan.unique()];
        let mut next = 0;
        let mut remaining = plan.unique();

        while remaining > 0 {
            tokio::select! {
                biased;

                outcome = outcome_rx.recv() => {
                    let Some(Outcome { index, result }) = outcome else {
                        // All senders are gone but some admitted item never reported.
                        let lost = reported[..next].iter().position(|done| !done).unwrap_or(0);
                        return Err(CacheError::WorkerLost {
                            item_code: plan.items()[lost].item_code.clone(),
                        });
                    };

                    let item = &plan.items()[index];
                    match result {
                        Ok(price) => {
                            for &position in &item.positions {
                                prices[position] = price;
                            }
                            reported[index] = true;
                            remaining -= 1;
                        }
                        Err(err) => {
                            warn!(
                                item_code = %item.item_code,
                                in_flight = next - (plan.unique() - remaining) - 1,
                                not_started = plan.unique() - next,
                                error = %err,
                                "Aborting price batch"
                            );
                            return Err(err);
                        }
                    }
                }

                permit = Arc::clone(&slots).acquire_owned(), if next < plan.unique() => {
                    let permit = permit.map_err(|_| CacheError::AdmissionClosed)?;
                    let Some(tx) = outcome_tx.as_ref() else {
                        return Err(CacheError::AdmissionClosed);
                    };
                    self.spawn_worker(next, plan.items()[next].item_code.clone(), permit, tx.clone());
                    next += 1;
                    if next == plan.unique() {
                        // Let the channel close once the last worker finishes.
                        outcome_tx = None;
                    }
                }
            }
        }

        Ok(prices)
    }

    /// Resolve one work item on its own task.
    ///
    /// The admission slot is released as soon as the resolution finishes,
    /// before the outcome is reported.
    fn spawn_worker(
        &self,
        index: usize,
        item_code: ItemCode,
        permit: OwnedSemaphorePermit,
        outcome_tx: mpsc::Sender<Outcome>,
    ) {
        trace!(item_code = %item_code, index, "Admitting price lookup");
        let cache = self.clone();
        let span = tracing::debug_span!("price_worker", item_code = %item_code);

        tokio::spawn(
            async move {
                let result = cache.resolve_one(&item_code).await;
                drop(permit);
                // The collector is gone if the batch already failed.
                let _ = outcome_tx.send(Outcome { index, result }).await;
            }
            .instrument(span),
        );
    }
}
