//! In-memory provider and backoff doubles with call accounting.

use async_trait::async_trait;
use portfolio_core::{
    CashFlowStatement, CompanyInfo, MarketDataProvider, UpstreamCause, UpstreamError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::backoff::BackoffPolicy;

/// Doubles may be shared with a task that panics on purpose.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Provider returning the same canned fundamentals for every symbol unless
/// told otherwise.
#[derive(Default)]
pub struct ScriptedProvider {
    failures: Mutex<HashMap<String, UpstreamCause>>,
    empty_history: Mutex<HashSet<String>>,
    stalls: Mutex<HashMap<String, Duration>>,
    panics: Mutex<HashSet<String>>,
    latency: Mutex<Option<Duration>>,
    close_calls: AtomicUsize,
    info_calls: AtomicUsize,
    cash_flow_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub const CLOSE: f64 = 101.25;
    pub const INFO_PRICE: f64 = 99.5;

    pub fn new() -> Self {
        Self::default()
    }

    /// Make the quote call for `symbol` fail with `cause`.
    pub fn fail(&self, symbol: &str, cause: UpstreamCause) {
        lock(&self.failures).insert(symbol.to_string(), cause);
    }

    pub fn empty_history(&self, symbol: &str) {
        lock(&self.empty_history).insert(symbol.to_string());
    }

    /// Delay the quote call for `symbol` by `duration`.
    pub fn stall(&self, symbol: &str, duration: Duration) {
        lock(&self.stalls).insert(symbol.to_string(), duration);
    }

    pub fn panic_on(&self, symbol: &str) {
        lock(&self.panics).insert(symbol.to_string());
    }

    pub fn clear_panics(&self) {
        lock(&self.panics).clear();
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn cash_flow_calls(&self) -> usize {
        self.cash_flow_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.close_calls() + self.info_calls() + self.cash_flow_calls()
    }

    async fn simulate_latency(&self) {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn latest_close(&self, symbol: &str) -> Result<Option<f64>, UpstreamError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if lock(&self.panics).contains(symbol) {
            panic!("scripted panic for {}", symbol);
        }
        let stall = lock(&self.stalls).get(symbol).copied();
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        let failure = lock(&self.failures).get(symbol).cloned();
        if let Some(cause) = failure {
            return Err(UpstreamError::new(symbol, cause));
        }
        if lock(&self.empty_history).contains(symbol) {
            return Ok(None);
        }
        Ok(Some(Self::CLOSE))
    }

    async fn company_info(&self, _symbol: &str) -> Result<CompanyInfo, UpstreamError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        Ok(CompanyInfo {
            current_price: Some(Self::INFO_PRICE),
            market_cap: Some(1_000_000.0),
            trailing_pe: Some(23.456),
            total_revenue: Some(1_000.0),
            ebitda: Some(200.0),
            net_income_to_common: Some(100.0),
            debt_to_equity: Some(0.5),
            book_value: Some(50.0),
            price_to_sales: Some(2.0),
            price_to_book: Some(2.5),
        })
    }

    async fn cash_flow_statement(&self, _symbol: &str) -> Result<CashFlowStatement, UpstreamError> {
        self.cash_flow_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        Ok(CashFlowStatement::default()
            .with_row(CashFlowStatement::OPERATING_CASH_FLOW, vec![Some(100.0); 5])
            .with_row(CashFlowStatement::FREE_CASH_FLOW, vec![Some(40.0); 5]))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackoffEvent {
    Courtesy(String),
    Cooldown(String),
}

/// Records every backoff request without sleeping.
#[derive(Default)]
pub struct RecordingBackoff {
    events: Mutex<Vec<BackoffEvent>>,
}

impl RecordingBackoff {
    pub fn events(&self) -> Vec<BackoffEvent> {
        lock(&self.events).clone()
    }
}

#[async_trait]
impl BackoffPolicy for RecordingBackoff {
    async fn courtesy_delay(&self, symbol: &str) {
        lock(&self.events).push(BackoffEvent::Courtesy(symbol.to_string()));
    }

    async fn rate_limit_cooldown(&self, symbol: &str) {
        lock(&self.events).push(BackoffEvent::Cooldown(symbol.to_string()));
    }
}
