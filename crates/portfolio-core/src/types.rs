use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::SymbolEntry;

/// Company info bag as reported by the provider. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub total_revenue: Option<f64>,
    pub ebitda: Option<f64>,
    pub net_income_to_common: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub book_value: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub price_to_book: Option<f64>,
}

/// Cash-flow statement rows keyed by line item, most recent period first.
/// A `None` entry is a reporting period the provider had no value for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub rows: HashMap<String, Vec<Option<f64>>>,
}

impl CashFlowStatement {
    pub const OPERATING_CASH_FLOW: &'static str = "Operating Cash Flow";
    pub const FREE_CASH_FLOW: &'static str = "Free Cash Flow";

    pub fn with_row(mut self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.rows.insert(name.to_string(), values);
        self
    }

    pub fn row(&self, name: &str) -> Option<&[Option<f64>]> {
        self.rows.get(name).map(|v| v.as_slice())
    }
}

/// Everything fetched for one symbol in one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProviderRecord {
    pub current_price: Option<f64>,
    pub info: CompanyInfo,
    pub cash_flow: CashFlowStatement,
}

/// Derived metrics for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMetrics {
    pub sector: String,
    pub symbol: String,
    pub company_name: String,
    pub cmp: Option<f64>,
    pub market_cap: Option<i64>,
    pub pe_ratio: Option<f64>,
    pub revenue_ttm: Option<i64>,
    pub ebitda_ttm: Option<i64>,
    pub ebitda_percentage: Option<f64>,
    pub pat: Option<i64>,
    pub pat_percentage: Option<f64>,
    pub cfo_latest: Option<i64>,
    pub cfo_5period_sum: Option<i64>,
    pub free_cash_flow_5period_sum: Option<i64>,
    pub debt_to_equity: Option<f64>,
    pub book_value: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub price_to_book: Option<f64>,
    pub cfo_to_ebitda: Option<f64>,
    pub cfo_to_pat: Option<f64>,
}

/// A symbol whose fetch failed within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockError {
    pub sector: String,
    pub symbol: String,
    pub company_name: String,
    pub error: String,
}

impl StockError {
    pub fn new(entry: &SymbolEntry, error: impl Into<String>) -> Self {
        Self {
            sector: entry.sector.clone(),
            symbol: entry.symbol.clone(),
            company_name: entry.company_name.clone(),
            error: error.into(),
        }
    }
}

/// Per-symbol outcome of a refresh.
///
/// `Error` is listed first so untagged deserialization only picks it when an
/// `error` field is present; every metrics field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StockResult {
    Error(StockError),
    Metrics(Box<StockMetrics>),
}

impl StockResult {
    pub fn symbol(&self) -> &str {
        match self {
            StockResult::Metrics(m) => &m.symbol,
            StockResult::Error(e) => &e.symbol,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StockResult::Error(_))
    }
}

/// One complete batch result across the whole universe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub entries: Vec<StockResult>,
    pub produced_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_error()).count()
    }
}

/// Live price for one symbol; `cmp` is `None` when the fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub sector: String,
    pub symbol: String,
    pub company_name: String,
    pub cmp: Option<f64>,
}
