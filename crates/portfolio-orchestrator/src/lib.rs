use portfolio_core::{MarketDataProvider, PortfolioError, PriceEntry, SymbolUniverse};
use std::sync::Arc;
use std::time::Duration;

pub mod backoff;
pub mod cache;
pub mod fetcher;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backoff::{BackoffPolicy, JitteredBackoff, NoBackoff};
pub use cache::{CacheRead, CacheStatus, SnapshotCache, DEFAULT_CACHE_LIFETIME};
pub use fetcher::{BatchFetcher, DEFAULT_BATCH_TIMEOUT};

/// Entry point used by the HTTP layer: cached stock details plus the
/// uncached live-price path over the same fetcher.
pub struct PortfolioOrchestrator {
    fetcher: Arc<BatchFetcher>,
    cache: SnapshotCache,
}

impl PortfolioOrchestrator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        backoff: Arc<dyn BackoffPolicy>,
        universe: SymbolUniverse,
        cache_lifetime: Duration,
        batch_timeout: Duration,
    ) -> Self {
        let fetcher = Arc::new(
            BatchFetcher::new(provider, backoff, Arc::new(universe))
                .with_batch_timeout(batch_timeout),
        );
        let cache = SnapshotCache::new(Arc::clone(&fetcher), cache_lifetime);
        Self { fetcher, cache }
    }

    /// Metrics for every symbol, served from the snapshot cache.
    pub async fn stock_details(&self) -> Result<CacheRead, PortfolioError> {
        self.cache.get().await
    }

    /// Live prices, always fetched upstream.
    pub async fn current_prices(&self) -> Vec<PriceEntry> {
        self.fetcher.fetch_prices().await
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.cache.status()
    }

    pub fn universe(&self) -> &SymbolUniverse {
        self.fetcher.universe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn orchestrator(provider: Arc<ScriptedProvider>) -> PortfolioOrchestrator {
        PortfolioOrchestrator::new(
            provider,
            Arc::new(NoBackoff),
            SymbolUniverse::default(),
            DEFAULT_CACHE_LIFETIME,
            DEFAULT_BATCH_TIMEOUT,
        )
    }

    #[tokio::test]
    async fn test_prices_bypass_cache() {
        let provider = Arc::new(ScriptedProvider::new());
        let orchestrator = orchestrator(provider.clone());
        let n = orchestrator.universe().len();

        orchestrator.stock_details().await.unwrap();
        assert_eq!(provider.close_calls(), n);

        let prices = orchestrator.current_prices().await;
        assert_eq!(prices.len(), n);
        assert_eq!(provider.close_calls(), 2 * n);

        orchestrator.current_prices().await;
        assert_eq!(provider.close_calls(), 3 * n);

        // Details are still cached
        assert!(orchestrator.stock_details().await.unwrap().cached);
        assert_eq!(provider.close_calls(), 3 * n);
    }

    #[tokio::test]
    async fn test_prices_do_not_populate_cache() {
        let provider = Arc::new(ScriptedProvider::new());
        let orchestrator = orchestrator(provider);

        orchestrator.current_prices().await;
        assert!(!orchestrator.cache_status().is_cached);
    }
}
