//! Yahoo Finance adapter for the `MarketDataProvider` trait.
//!
//! Three endpoints are used per symbol: the v8 chart API for the latest
//! daily close, `quoteSummary` for the company info bag (requires a cookie
//! and crumb), and the fundamentals timeseries API for annual cash-flow rows.

mod rate_limiter;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use portfolio_core::{
    CashFlowStatement, CompanyInfo, MarketDataProvider, UpstreamCause, UpstreamError,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use rate_limiter::RateLimiter;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const SUMMARY_MODULES: &str = "price,summaryDetail,financialData,defaultKeyStatistics";
const OPERATING_CASH_FLOW_SERIES: &str = "annualOperatingCashFlow";
const FREE_CASH_FLOW_SERIES: &str = "annualFreeCashFlow";
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// Host serving quoteSummary, timeseries and the crumb endpoint.
    pub base_url: String,
    /// Host serving the v8 chart API.
    pub chart_url: String,
    /// Any page that sets the Yahoo session cookie.
    pub cookie_url: String,
    pub rate_limit_per_minute: usize,
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com".to_string(),
            chart_url: "https://query1.finance.yahoo.com".to_string(),
            cookie_url: "https://fc.yahoo.com".to_string(),
            rate_limit_per_minute: 60,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct YahooClient {
    config: YahooConfig,
    client: Client,
    rate_limiter: RateLimiter,
    crumb: Mutex<Option<String>>,
}

impl YahooClient {
    pub fn new(config: YahooConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            rate_limiter: RateLimiter::new(config.rate_limit_per_minute, Duration::from_secs(60)),
            config,
            client,
            crumb: Mutex::new(None),
        })
    }

    /// Send a request through the limiter. HTTP 429 is reported as
    /// `RateLimited` without retrying; the caller owns the cooldown.
    async fn send_request(
        &self,
        symbol: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, UpstreamError> {
        self.rate_limiter.acquire().await;

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::new(symbol, UpstreamCause::Network(e.to_string())))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Yahoo 429 rate limited on {}", symbol);
            return Err(UpstreamError::new(symbol, UpstreamCause::RateLimited));
        }

        Ok(response)
    }

    /// Map a non-success status to an `UpstreamError`.
    async fn check_status(
        symbol: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let cause = match status {
            StatusCode::NOT_FOUND => UpstreamCause::UnknownSymbol,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                UpstreamCause::Unauthorized(truncate(&body))
            }
            _ => UpstreamCause::Http {
                status: status.as_u16(),
                body: truncate(&body),
            },
        };
        Err(UpstreamError::new(symbol, cause))
    }

    async fn parse_json<T: DeserializeOwned>(
        symbol: &str,
        response: reqwest::Response,
    ) -> Result<T, UpstreamError> {
        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::new(symbol, UpstreamCause::Malformed(e.to_string())))
    }

    /// Cached crumb, fetched on first use.
    async fn crumb(&self, symbol: &str) -> Result<String, UpstreamError> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        // The consent host answers 404 but still sets the session cookie.
        self.rate_limiter.acquire().await;
        if let Err(e) = self.client.get(&self.config.cookie_url).send().await {
            tracing::debug!("Yahoo cookie request failed: {}", e);
        }

        let url = format!("{}/v1/test/getcrumb", self.config.base_url);
        let response = self.send_request(symbol, self.client.get(&url)).await?;
        let response = Self::check_status(symbol, response).await?;
        let crumb = response
            .text()
            .await
            .map_err(|e| UpstreamError::new(symbol, UpstreamCause::Network(e.to_string())))?
            .trim()
            .to_string();

        if crumb.is_empty() || crumb.contains('<') {
            return Err(UpstreamError::new(
                symbol,
                UpstreamCause::Unauthorized("Yahoo returned an invalid crumb".to_string()),
            ));
        }

        tracing::info!("Obtained Yahoo crumb");
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    async fn fetch_quote_summary(&self, symbol: &str) -> Result<SummaryResult, UpstreamError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.config.base_url, symbol);

        for attempt in 0..2u32 {
            let crumb = self.crumb(symbol).await?;
            let response = self
                .send_request(
                    symbol,
                    self.client
                        .get(&url)
                        .query(&[("modules", SUMMARY_MODULES), ("crumb", crumb.as_str())]),
                )
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                tracing::info!("Yahoo crumb rejected for {}, re-authenticating", symbol);
                self.invalidate_crumb().await;
                continue;
            }

            let response = Self::check_status(symbol, response).await?;
            let body: QuoteSummaryResponse = Self::parse_json(symbol, response).await?;
            return body.into_result(symbol);
        }

        Err(UpstreamError::new(
            symbol,
            UpstreamCause::Unauthorized("crumb rejected twice".to_string()),
        ))
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn latest_close(&self, symbol: &str) -> Result<Option<f64>, UpstreamError> {
        let url = format!("{}/v8/finance/chart/{}", self.config.chart_url, symbol);

        let response = self
            .send_request(
                symbol,
                self.client
                    .get(&url)
                    .query(&[("range", "5d"), ("interval", "1d")]),
            )
            .await?;
        let response = Self::check_status(symbol, response).await?;
        let body: ChartResponse = Self::parse_json(symbol, response).await?;
        body.latest_close(symbol)
    }

    async fn company_info(&self, symbol: &str) -> Result<CompanyInfo, UpstreamError> {
        let summary = self.fetch_quote_summary(symbol).await?;
        Ok(summary.into_company_info())
    }

    async fn cash_flow_statement(&self, symbol: &str) -> Result<CashFlowStatement, UpstreamError> {
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}",
            self.config.base_url, symbol
        );
        let now = Utc::now();
        let period1 = (now - ChronoDuration::days(365 * 10)).timestamp().to_string();
        let period2 = now.timestamp().to_string();
        let types = format!("{},{}", OPERATING_CASH_FLOW_SERIES, FREE_CASH_FLOW_SERIES);

        let response = self
            .send_request(
                symbol,
                self.client.get(&url).query(&[
                    ("type", types.as_str()),
                    ("period1", period1.as_str()),
                    ("period2", period2.as_str()),
                ]),
            )
            .await?;
        let response = Self::check_status(symbol, response).await?;
        let body: TimeseriesResponse = Self::parse_json(symbol, response).await?;
        body.into_statement(symbol)
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

// Chart response
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    fn latest_close(self, symbol: &str) -> Result<Option<f64>, UpstreamError> {
        if let Some(err) = self.chart.error {
            return Err(err.into_upstream(symbol));
        }

        Ok(self
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.indicators)
            .and_then(|i| i.quote.into_iter().next())
            .and_then(|q| q.close.into_iter().rev().flatten().next()))
    }
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

impl YahooApiError {
    fn into_upstream(self, symbol: &str) -> UpstreamError {
        let cause = if self.code.eq_ignore_ascii_case("Not Found") {
            UpstreamCause::UnknownSymbol
        } else {
            UpstreamCause::Malformed(format!(
                "{}: {}",
                self.code,
                self.description.unwrap_or_default()
            ))
        };
        UpstreamError::new(symbol, cause)
    }
}

// quoteSummary response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryEnvelope,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    result: Option<Vec<SummaryResult>>,
    error: Option<YahooApiError>,
}

impl QuoteSummaryResponse {
    fn into_result(self, symbol: &str) -> Result<SummaryResult, UpstreamError> {
        if let Some(err) = self.quote_summary.error {
            return Err(err.into_upstream(symbol));
        }
        self.quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| UpstreamError::new(symbol, UpstreamCause::UnknownSymbol))
    }
}

/// Yahoo's `{"raw": 1.0, "fmt": "1.00"}` wrapper; `{}` means no value.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(default)]
    financial_data: Option<FinancialDataModule>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatisticsModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(default)]
    market_cap: Option<RawValue>,
    #[serde(default)]
    price_to_sales_trailing12_months: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    #[serde(default)]
    current_price: Option<RawValue>,
    #[serde(default)]
    total_revenue: Option<RawValue>,
    #[serde(default)]
    ebitda: Option<RawValue>,
    #[serde(default)]
    debt_to_equity: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatisticsModule {
    #[serde(default)]
    net_income_to_common: Option<RawValue>,
    #[serde(default)]
    book_value: Option<RawValue>,
    #[serde(default)]
    price_to_book: Option<RawValue>,
}

impl SummaryResult {
    fn into_company_info(self) -> CompanyInfo {
        let price = self.price.unwrap_or_default();
        let detail = self.summary_detail.unwrap_or_default();
        let financial = self.financial_data.unwrap_or_default();
        let stats = self.default_key_statistics.unwrap_or_default();

        CompanyInfo {
            current_price: raw(&financial.current_price),
            market_cap: raw(&price.market_cap).or_else(|| raw(&detail.market_cap)),
            trailing_pe: raw(&detail.trailing_pe),
            total_revenue: raw(&financial.total_revenue),
            ebitda: raw(&financial.ebitda),
            net_income_to_common: raw(&stats.net_income_to_common),
            debt_to_equity: raw(&financial.debt_to_equity),
            book_value: raw(&stats.book_value),
            price_to_sales: raw(&detail.price_to_sales_trailing12_months),
            price_to_book: raw(&stats.price_to_book),
        }
    }
}

// Fundamentals timeseries response
#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    timeseries: TimeseriesEnvelope,
}

#[derive(Debug, Deserialize)]
struct TimeseriesEnvelope {
    #[serde(default)]
    result: Option<Vec<TimeseriesResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResult {
    meta: TimeseriesMeta,
    #[serde(flatten)]
    series: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesMeta {
    #[serde(rename = "type", default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeseriesPoint {
    as_of_date: String,
    #[serde(default)]
    reported_value: Option<RawValue>,
}

impl TimeseriesResponse {
    fn into_statement(self, symbol: &str) -> Result<CashFlowStatement, UpstreamError> {
        if let Some(err) = self.timeseries.error {
            return Err(err.into_upstream(symbol));
        }

        let mut statement = CashFlowStatement::default();
        for result in self.timeseries.result.unwrap_or_default() {
            for series_type in &result.meta.types {
                let row_name = match series_type.as_str() {
                    OPERATING_CASH_FLOW_SERIES => CashFlowStatement::OPERATING_CASH_FLOW,
                    FREE_CASH_FLOW_SERIES => CashFlowStatement::FREE_CASH_FLOW,
                    _ => continue,
                };
                let Some(value) = result.series.get(series_type) else {
                    continue;
                };
                let points: Vec<Option<TimeseriesPoint>> = serde_json::from_value(value.clone())
                    .map_err(|e| {
                        UpstreamError::new(symbol, UpstreamCause::Malformed(e.to_string()))
                    })?;

                let mut points: Vec<TimeseriesPoint> = points.into_iter().flatten().collect();
                // Most recent period first
                points.sort_by(|a, b| b.as_of_date.cmp(&a.as_of_date));
                let values = points.iter().map(|p| raw(&p.reported_value)).collect();
                statement.rows.insert(row_name.to_string(), values);
            }
        }

        Ok(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> YahooClient {
        YahooClient::new(YahooConfig {
            base_url: server.url(),
            chart_url: server.url(),
            cookie_url: format!("{}/consent", server.url()),
            rate_limit_per_minute: 1000,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    const CHART_BODY: &str = r#"{"chart":{"result":[{"meta":{"symbol":"INFY.NS"},
        "timestamp":[1,2,3],
        "indicators":{"quote":[{"close":[1490.5,1502.25,null]}]}}],"error":null}}"#;

    const SUMMARY_BODY: &str = r#"{"quoteSummary":{"result":[{
        "price":{"marketCap":{"raw":6250000000000,"fmt":"6.25T"}},
        "summaryDetail":{"trailingPE":{"raw":23.456,"fmt":"23.46"},
                         "priceToSalesTrailing12Months":{"raw":4.1}},
        "financialData":{"currentPrice":{"raw":1500.0},"totalRevenue":{"raw":1000.0},
                         "ebitda":{},"debtToEquity":{"raw":9.87}},
        "defaultKeyStatistics":{"netIncomeToCommon":{"raw":180.0},"bookValue":{"raw":210.3},
                                "priceToBook":{"raw":7.12}}}],"error":null}}"#;

    const TIMESERIES_BODY: &str = r#"{"timeseries":{"result":[
        {"meta":{"symbol":["INFY.NS"],"type":["annualOperatingCashFlow"]},"timestamp":[1,2,3],
         "annualOperatingCashFlow":[
            {"asOfDate":"2022-03-31","periodType":"12M","reportedValue":{"raw":230.0}},
            {"asOfDate":"2024-03-31","periodType":"12M","reportedValue":{"raw":250.0}},
            null,
            {"asOfDate":"2023-03-31","periodType":"12M","reportedValue":{"raw":240.0}}]},
        {"meta":{"symbol":["INFY.NS"],"type":["annualFreeCashFlow"]},"timestamp":[1],
         "annualFreeCashFlow":[
            {"asOfDate":"2024-03-31","periodType":"12M"}]}],"error":null}}"#;

    #[tokio::test]
    async fn test_latest_close_skips_trailing_null() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v8/finance/chart/INFY.NS")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(CHART_BODY)
            .create_async()
            .await;

        let client = client_for(&server);
        let close = client.latest_close("INFY.NS").await.unwrap();
        assert_eq!(close, Some(1502.25));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_history_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v8/finance/chart/INFY.NS")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        assert_eq!(client.latest_close("INFY.NS").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v8/finance/chart/NOPE.NS")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.latest_close("NOPE.NS").await.unwrap_err();
        assert_eq!(err.symbol, "NOPE.NS");
        assert_eq!(err.cause, UpstreamCause::UnknownSymbol);
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v8/finance/chart/INFY.NS")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body("Too Many Requests")
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.latest_close("INFY.NS").await.unwrap_err();
        assert!(err.is_rate_limited());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_carries_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v8/finance/chart/INFY.NS")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.latest_close("INFY.NS").await.unwrap_err();
        assert_eq!(
            err.cause,
            UpstreamCause::Http {
                status: 503,
                body: "unavailable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_company_info_with_crumb() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/consent")
            .with_status(404)
            .create_async()
            .await;
        let crumb = server
            .mock("GET", "/v1/test/getcrumb")
            .with_status(200)
            .with_body("abc123")
            .expect(1)
            .create_async()
            .await;
        let summary = server
            .mock("GET", "/v10/finance/quoteSummary/INFY.NS")
            .match_query(Matcher::UrlEncoded("crumb".into(), "abc123".into()))
            .with_status(200)
            .with_body(SUMMARY_BODY)
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server);
        let info = client.company_info("INFY.NS").await.unwrap();
        assert_eq!(info.market_cap, Some(6_250_000_000_000.0));
        assert_eq!(info.trailing_pe, Some(23.456));
        assert_eq!(info.current_price, Some(1500.0));
        assert_eq!(info.total_revenue, Some(1000.0));
        assert_eq!(info.ebitda, None);
        assert_eq!(info.net_income_to_common, Some(180.0));
        assert_eq!(info.debt_to_equity, Some(9.87));
        assert_eq!(info.book_value, Some(210.3));
        assert_eq!(info.price_to_sales, Some(4.1));
        assert_eq!(info.price_to_book, Some(7.12));

        // Second call reuses the cached crumb
        client.company_info("INFY.NS").await.unwrap();
        crumb.assert_async().await;
        summary.assert_async().await;
    }

    #[tokio::test]
    async fn test_session_requests_go_through_limiter() {
        let mut server = mockito::Server::new_async().await;
        let consent = server
            .mock("GET", "/consent")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/v1/test/getcrumb")
            .with_status(200)
            .with_body("abc123")
            .create_async()
            .await;
        server
            .mock("GET", "/v10/finance/quoteSummary/INFY.NS")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(SUMMARY_BODY)
            .create_async()
            .await;

        let client = client_for(&server);
        client.company_info("INFY.NS").await.unwrap();

        // consent + getcrumb + quoteSummary
        assert_eq!(client.rate_limiter.recorded().await, 3);
        consent.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_crumb_is_refreshed_once() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/consent")
            .with_status(404)
            .create_async()
            .await;
        let crumb = server
            .mock("GET", "/v1/test/getcrumb")
            .with_status(200)
            .with_body("stale")
            .expect(2)
            .create_async()
            .await;
        server
            .mock("GET", "/v10/finance/quoteSummary/INFY.NS")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"finance":{"error":{"code":"Unauthorized"}}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.company_info("INFY.NS").await.unwrap_err();
        assert!(matches!(err.cause, UpstreamCause::Unauthorized(_)));
        crumb.assert_async().await;
    }

    #[tokio::test]
    async fn test_cash_flow_rows_sorted_recent_first() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                "/ws/fundamentals-timeseries/v1/finance/timeseries/INFY.NS",
            )
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(TIMESERIES_BODY)
            .create_async()
            .await;

        let client = client_for(&server);
        let statement = client.cash_flow_statement("INFY.NS").await.unwrap();
        assert_eq!(
            statement.row(CashFlowStatement::OPERATING_CASH_FLOW).unwrap(),
            &[Some(250.0), Some(240.0), Some(230.0)]
        );
        assert_eq!(
            statement.row(CashFlowStatement::FREE_CASH_FLOW).unwrap(),
            &[None]
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v8/finance/chart/INFY.NS")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.latest_close("INFY.NS").await.unwrap_err();
        assert!(matches!(err.cause, UpstreamCause::Malformed(_)));
    }
}
