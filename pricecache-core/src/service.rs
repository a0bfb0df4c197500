//! Upstream price service contract.
//!
//! The cache treats the upstream as an opaque, slow and fallible lookup. It
//! performs no retries, backoff or circuit breaking around it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Price, ServiceError};

/// Service that retrieves the current price for an item.
///
/// Calls are expected to be expensive. Implementations must be safe to call
/// concurrently for different item codes.
#[async_trait]
pub trait PriceService: Send + Sync {
    /// Look up the price of a single item.
    async fn price_for(&self, item_code: &str) -> Result<Price, ServiceError>;
}

#[async_trait]
impl<T: PriceService + ?Sized> PriceService for Arc<T> {
    async fn price_for(&self, item_code: &str) -> Result<Price, ServiceError> {
        (**self).price_for(item_code).await
    }
}

/// Adapter for upstreams exposed as a synchronous, blocking function.
///
/// Each call runs on tokio's blocking thread pool so a slow upstream never
/// stalls the async workers driving a batch.
pub struct BlockingPriceService<F> {
    lookup: Arc<F>,
}

impl<F> BlockingPriceService<F>
where
    F: Fn(&str) -> Result<Price, ServiceError> + Send + Sync + 'static,
{
    pub fn new(lookup: F) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }
}

#[async_trait]
impl<F> PriceService for BlockingPriceService<F>
where
    F: Fn(&str) -> Result<Price, ServiceError> + Send + Sync + 'static,
{
    async fn price_for(&self, item_code: &str) -> Result<Price, ServiceError> {
        let lookup = Arc::clone(&self.lookup);
        let item_code = item_code.to_owned();
        match tokio::task::spawn_blocking(move || lookup(&item_code)).await {
            Ok(result) => result,
            Err(join_error) => Err(Box::new(join_error)),
        }
    }
}

impl<F> std::fmt::Debug for BlockingPriceService<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingPriceService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_blocking_service_returns_price() {
        let service = BlockingPriceService::new(|code: &str| match code {
            "p1" => Ok(5.0),
            other => Err(format!("unknown item {other}").into()),
        });

        assert_eq!(service.price_for("p1").await.unwrap(), 5.0);
        let err = service.price_for("p2").await.unwrap_err();
        assert!(err.to_string().contains("p2"));
    }

    #[tokio::test]
    async fn test_blocking_service_panic_becomes_error() {
        let service = BlockingPriceService::new(|_: &str| -> Result<Price, ServiceError> {
            panic!("upstream exploded")
        });

        assert!(service.price_for("p1").await.is_err());
    }

    #[tokio::test]
    async fn test_arc_service_delegates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let service = Arc::new(BlockingPriceService::new(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(1.5)
        }));

        let shared: Arc<dyn PriceService> = service;
        assert_eq!(shared.price_for("p1").await.unwrap(), 1.5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
