use async_trait::async_trait;
use crate::{CashFlowStatement, CompanyInfo, UpstreamError};

/// Per-symbol access to an external market-data provider.
///
/// The three calls are separate so callers can pace the expensive
/// cash-flow request independently of the cheap quote/info calls.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Close of the most recent daily bar, `None` when the history is empty.
    async fn latest_close(&self, symbol: &str) -> Result<Option<f64>, UpstreamError>;

    async fn company_info(&self, symbol: &str) -> Result<CompanyInfo, UpstreamError>;

    async fn cash_flow_statement(&self, symbol: &str) -> Result<CashFlowStatement, UpstreamError>;
}
