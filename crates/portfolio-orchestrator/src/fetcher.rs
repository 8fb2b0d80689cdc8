use chrono::Utc;
use fundamental_metrics::compute_metrics;
use portfolio_core::{
    MarketDataProvider, PriceEntry, RawProviderRecord, Snapshot, StockError, StockResult,
    SymbolEntry, SymbolUniverse, UpstreamCause, UpstreamError,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::backoff::BackoffPolicy;

/// Default overall deadline for one pass over the universe.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Walks the symbol universe sequentially, one upstream symbol at a time.
pub struct BatchFetcher {
    provider: Arc<dyn MarketDataProvider>,
    backoff: Arc<dyn BackoffPolicy>,
    universe: Arc<SymbolUniverse>,
    batch_timeout: Duration,
}

impl BatchFetcher {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        backoff: Arc<dyn BackoffPolicy>,
        universe: Arc<SymbolUniverse>,
    ) -> Self {
        Self {
            provider,
            backoff,
            universe,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }

    pub fn with_batch_timeout(mut self, batch_timeout: Duration) -> Self {
        self.batch_timeout = batch_timeout;
        self
    }

    pub fn universe(&self) -> &SymbolUniverse {
        &self.universe
    }

    /// Fetch and compute metrics for every configured symbol. Never fails:
    /// a symbol that cannot be fetched becomes an error entry.
    pub async fn refresh(&self) -> Snapshot {
        let started = Instant::now();
        let deadline = started + self.batch_timeout;
        tracing::info!("Refreshing portfolio snapshot for {} symbols", self.universe.len());

        let mut entries = Vec::with_capacity(self.universe.len());
        for entry in self.universe.entries() {
            let outcome = self
                .guarded(entry, deadline, self.fetch_record(&entry.symbol))
                .await;

            let result = match outcome {
                Ok(raw) => StockResult::Metrics(Box::new(compute_metrics(entry, &raw))),
                Err(err) => StockResult::Error(StockError::new(entry, err.cause.to_string())),
            };
            entries.push(result);
        }

        let snapshot = Snapshot {
            entries,
            produced_at: Utc::now(),
        };
        tracing::info!(
            "Snapshot refreshed in {:.1}s: {} ok, {} failed",
            started.elapsed().as_secs_f64(),
            snapshot.len() - snapshot.error_count(),
            snapshot.error_count()
        );
        snapshot
    }

    /// Live price per symbol, in universe order. Failed symbols get `None`.
    pub async fn fetch_prices(&self) -> Vec<PriceEntry> {
        let deadline = Instant::now() + self.batch_timeout;

        let mut prices = Vec::with_capacity(self.universe.len());
        for entry in self.universe.entries() {
            let cmp = self
                .guarded(entry, deadline, self.fetch_price(&entry.symbol))
                .await
                .ok()
                .flatten()
                .map(fundamental_metrics::round2);

            prices.push(PriceEntry {
                sector: entry.sector.clone(),
                symbol: entry.symbol.clone(),
                company_name: entry.company_name.clone(),
                cmp,
            });
        }
        prices
    }

    async fn fetch_record(&self, symbol: &str) -> Result<RawProviderRecord, UpstreamError> {
        let close = self.provider.latest_close(symbol).await?;
        let info = self.provider.company_info(symbol).await?;

        self.backoff.courtesy_delay(symbol).await;
        let cash_flow = self.provider.cash_flow_statement(symbol).await?;

        Ok(RawProviderRecord {
            current_price: close.or(info.current_price),
            info,
            cash_flow,
        })
    }

    async fn fetch_price(&self, symbol: &str) -> Result<Option<f64>, UpstreamError> {
        match self.provider.latest_close(symbol).await? {
            Some(close) => Ok(Some(close)),
            None => Ok(self.provider.company_info(symbol).await?.current_price),
        }
    }

    /// Run one symbol's fetch under the batch deadline, logging failures and
    /// cooling down after a rate-limit rejection.
    async fn guarded<T>(
        &self,
        entry: &SymbolEntry,
        deadline: Instant,
        fetch: impl Future<Output = Result<T, UpstreamError>>,
    ) -> Result<T, UpstreamError> {
        let deadline_error = || UpstreamError::new(&entry.symbol, UpstreamCause::DeadlineExceeded);

        if Instant::now() >= deadline {
            return Err(deadline_error());
        }

        let result = match timeout_at(deadline, fetch).await {
            Ok(result) => result,
            Err(_) => Err(deadline_error()),
        };

        if let Err(err) = &result {
            tracing::warn!("Failed to fetch {} ({}): {}", entry.symbol, entry.company_name, err.cause);
            if err.is_rate_limited() {
                // The cooldown never extends the batch past its deadline.
                let cooldown = self.backoff.rate_limit_cooldown(&entry.symbol);
                if timeout_at(deadline, cooldown).await.is_err() {
                    tracing::debug!("Cooldown for {} cut short by batch deadline", entry.symbol);
                }
            }
        }

        result
    }
}
