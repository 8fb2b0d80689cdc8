//! Derived financial metrics for one symbol.
//!
//! Every derivation is guarded: a missing or non-finite input, or a zero
//! denominator, yields `None` for that metric and never a panic.

use portfolio_core::{CashFlowStatement, RawProviderRecord, StockMetrics, SymbolEntry};

/// Number of reporting periods summed for the multi-period cash-flow totals.
pub const CASH_FLOW_PERIODS: usize = 5;

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Round to two decimal places, ties to even (`0.125` -> `0.12`).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

fn to_integer(value: Option<f64>) -> Option<i64> {
    finite(value).map(|v| v.trunc() as i64)
}

/// `numerator / denominator * 100`, rounded to two decimals.
pub fn calculate_percentage(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    calculate_ratio(numerator, denominator)
        .map(|r| round2(r * 100.0))
        .filter(|v| v.is_finite())
}

/// `numerator / denominator`, unrounded; `None` on a zero or absent denominator.
fn calculate_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let numerator = finite(numerator)?;
    let denominator = finite(denominator)?;
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

/// Most recent entry of a cash-flow row.
fn latest_period(statement: &CashFlowStatement, row: &str) -> Option<i64> {
    let values = statement.row(row)?;
    to_integer(*values.first()?)
}

/// Sum of the first `periods` entries; `None` if the row is shorter or any
/// of those periods is missing.
fn sum_periods(statement: &CashFlowStatement, row: &str, periods: usize) -> Option<i64> {
    let values = statement.row(row)?;
    if values.len() < periods {
        return None;
    }
    let mut total = 0.0;
    for value in &values[..periods] {
        total += finite(*value)?;
    }
    Some(total.trunc() as i64)
}

/// Turn one symbol's raw provider fields into its metrics record.
pub fn compute_metrics(entry: &SymbolEntry, raw: &RawProviderRecord) -> StockMetrics {
    let info = &raw.info;
    let revenue = finite(info.total_revenue);
    let ebitda = finite(info.ebitda);
    let pat = finite(info.net_income_to_common);

    let cfo_latest = latest_period(&raw.cash_flow, CashFlowStatement::OPERATING_CASH_FLOW);
    let cfo_latest_f = cfo_latest.map(|v| v as f64);

    StockMetrics {
        sector: entry.sector.clone(),
        symbol: entry.symbol.clone(),
        company_name: entry.company_name.clone(),
        cmp: finite(raw.current_price).map(round2),
        market_cap: to_integer(info.market_cap),
        pe_ratio: finite(info.trailing_pe).map(round2),
        revenue_ttm: to_integer(revenue),
        ebitda_ttm: to_integer(ebitda),
        ebitda_percentage: calculate_percentage(ebitda, revenue),
        pat: to_integer(pat),
        pat_percentage: calculate_percentage(pat, revenue),
        cfo_latest,
        cfo_5period_sum: sum_periods(
            &raw.cash_flow,
            CashFlowStatement::OPERATING_CASH_FLOW,
            CASH_FLOW_PERIODS,
        ),
        free_cash_flow_5period_sum: sum_periods(
            &raw.cash_flow,
            CashFlowStatement::FREE_CASH_FLOW,
            CASH_FLOW_PERIODS,
        ),
        debt_to_equity: finite(info.debt_to_equity).map(round2),
        book_value: finite(info.book_value),
        price_to_sales: finite(info.price_to_sales).map(round2),
        price_to_book: finite(info.price_to_book).map(round2),
        cfo_to_ebitda: calculate_ratio(cfo_latest_f, ebitda).map(round2),
        cfo_to_pat: calculate_ratio(cfo_latest_f, pat).map(round2),
    }
}
