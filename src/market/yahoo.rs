//! Yahoo Finance provider.
//!
//! Uses the public query endpoints:
//!
//! - `/v8/finance/chart/{symbol}` for bars, dividends and splits
//! - `/v10/finance/quoteSummary/{symbol}` for the company snapshot and the
//!   financial statements
//!
//! `quoteSummary` wants a session crumb. The crumb is fetched on first use and
//! kept until the provider rejects it with 401, after which the request is
//! retried once with a fresh one. Requests go out without a crumb when none
//! can be had.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::ProviderConfig;
use crate::market::error::{ProviderError, ProviderResult};
use crate::market::{
    CompanyInfo, DividendSeries, FinancialStatement, HistoryQuery, Interval, MarketDataProvider,
    PriceBar, PriceSeries, ReportingFrequency, SplitSeries, StatementPeriod, Statements,
};

const COMPANY_INFO_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData";

/// `(module, list key)` for the income, balance-sheet and cash-flow modules.
const ANNUAL_STATEMENT_MODULES: [(&str, &str); 3] = [
    ("incomeStatementHistory", "incomeStatementHistory"),
    ("balanceSheetHistory", "balanceSheetStatements"),
    ("cashflowStatementHistory", "cashflowStatements"),
];

const QUARTERLY_STATEMENT_MODULES: [(&str, &str); 3] = [
    ("incomeStatementHistoryQuarterly", "incomeStatementHistory"),
    ("balanceSheetHistoryQuarterly", "balanceSheetStatements"),
    ("cashflowStatementHistoryQuarterly", "cashflowStatements"),
];

/// Market-data provider backed by Yahoo Finance.
pub struct YahooProvider {
    client: Client,
    base_url: Url,
    cookie_url: Option<String>,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    /// Creates a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is unusable or the HTTP client cannot
    /// be built.
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                ProviderError::api(format!("invalid provider base URL '{}'", config.base_url))
            })?;

        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .cookie_store(true);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            cookie_url: config.cookie_url.clone(),
            crumb: Mutex::new(None),
        })
    }

    /// Builds an endpoint URL under the base URL. Each segment is
    /// percent-encoded on its own, so a symbol can't add path or query parts.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Returns the cached crumb, fetching one if there is none. Failed
    /// fetches are not cached.
    async fn crumb(&self) -> Option<String> {
        let mut cached = self.crumb.lock().await;
        if cached.is_none() {
            *cached = self.fetch_crumb().await;
        }
        cached.clone()
    }

    async fn fetch_crumb(&self) -> Option<String> {
        if let Some(cookie_url) = &self.cookie_url {
            // Any response sets the cookie; the status is irrelevant.
            if let Err(e) = self.client.get(cookie_url).send().await {
                tracing::debug!(error = %e, "Session cookie request failed");
            }
        }

        let url = self.endpoint(&["v1", "test", "getcrumb"]);
        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!(status = %response.status(), "Crumb request rejected");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Crumb request failed");
                return None;
            }
        };

        let text = response.text().await.ok()?;
        let crumb = text.trim();
        if crumb.is_empty() || crumb.contains('<') {
            return None;
        }
        tracing::debug!("Obtained provider crumb");
        Some(crumb.to_string())
    }

    async fn get(
        &self,
        symbol: &str,
        url: Url,
        query: &[(&str, String)],
    ) -> ProviderResult<(StatusCode, String)> {
        tracing::debug!(symbol, url = %url, "Provider request");
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn chart(&self, symbol: &str, query: &[(&str, String)]) -> ProviderResult<ChartResult> {
        let url = self.endpoint(&["v8", "finance", "chart", symbol]);
        let (status, body) = self.get(symbol, url, query).await?;
        decode::<ChartResponse>(symbol, status, &body)?
            .chart
            .into_first(symbol)
    }

    async fn quote_summary(&self, symbol: &str, modules: &str) -> ProviderResult<Value> {
        let mut response = self.quote_summary_once(symbol, modules).await?;
        if response.0 == StatusCode::UNAUTHORIZED {
            // Missing or expired crumb: drop it and try once more with a fresh one.
            tracing::debug!(symbol, "Crumb rejected, refreshing");
            *self.crumb.lock().await = None;
            response = self.quote_summary_once(symbol, modules).await?;
        }

        let (status, body) = response;
        decode::<QuoteSummaryResponse>(symbol, status, &body)?
            .quote_summary
            .into_first(symbol)
    }

    async fn quote_summary_once(
        &self,
        symbol: &str,
        modules: &str,
    ) -> ProviderResult<(StatusCode, String)> {
        let url = self.endpoint(&["v10", "finance", "quoteSummary", symbol]);
        let mut query = vec![("modules", modules.to_string())];
        if let Some(crumb) = self.crumb().await {
            query.push(("crumb", crumb));
        }
        self.get(symbol, url, &query).await
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn company_info(&self, symbol: &str) -> ProviderResult<CompanyInfo> {
        let summary = self.quote_summary(symbol, COMPANY_INFO_MODULES).await?;
        company_info_from_summary(&summary)
    }

    async fn recent_bars(&self, symbol: &str) -> ProviderResult<PriceSeries> {
        let query = [
            ("range", "5d".to_string()),
            ("interval", "1d".to_string()),
        ];
        let chart = self.chart(symbol, &query).await?;
        Ok(series_from_chart(&chart, false))
    }

    async fn price_history(
        &self,
        symbol: &str,
        query: &HistoryQuery,
    ) -> ProviderResult<PriceSeries> {
        // period2 is exclusive; ask for the day after `end`.
        let end = query.end.checked_add_days(Days::new(1)).unwrap_or(query.end);
        let params = [
            ("period1", midnight_timestamp(query.start).to_string()),
            ("period2", midnight_timestamp(end).to_string()),
            ("interval", chart_interval(query.interval).to_string()),
            ("events", "div,split".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ];
        let chart = self.chart(symbol, &params).await?;
        Ok(series_from_chart(&chart, query.adjusted))
    }

    async fn statements(
        &self,
        symbol: &str,
        frequency: ReportingFrequency,
    ) -> ProviderResult<Statements> {
        let modules = match frequency {
            ReportingFrequency::Annual => ANNUAL_STATEMENT_MODULES,
            ReportingFrequency::Quarterly => QUARTERLY_STATEMENT_MODULES,
        };
        let names: Vec<&str> = modules.iter().map(|(module, _)| *module).collect();
        let summary = self.quote_summary(symbol, &names.join(",")).await?;

        let [income, balance, cashflow] = modules;
        let mut cashflow = statement_from_summary(&summary, cashflow.0, cashflow.1);
        for period in &mut cashflow {
            derive_free_cash_flow(period);
        }
        Ok(Statements {
            income: statement_from_summary(&summary, income.0, income.1),
            balance: statement_from_summary(&summary, balance.0, balance.1),
            cashflow,
        })
    }

    async fn dividends(&self, symbol: &str) -> ProviderResult<DividendSeries> {
        let chart = self.chart(symbol, &event_query()).await?;
        Ok(dividends_from_chart(&chart))
    }

    async fn splits(&self, symbol: &str) -> ProviderResult<SplitSeries> {
        let chart = self.chart(symbol, &event_query()).await?;
        Ok(splits_from_chart(&chart))
    }
}

fn event_query() -> [(&'static str, String); 3] {
    [
        ("range", "max".to_string()),
        ("interval", "1mo".to_string()),
        ("events", "div,split".to_string()),
    ]
}

const fn chart_interval(interval: Interval) -> &'static str {
    match interval {
        Interval::Daily => "1d",
        Interval::Weekly => "1wk",
        Interval::Monthly => "1mo",
    }
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Converts a UTC timestamp to the exchange-local calendar date.
fn local_date(timestamp: i64, gmt_offset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp.checked_add(gmt_offset)?, 0).map(|dt| dt.date_naive())
}

// === Response envelopes ===

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Envelope<ChartResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: Envelope<Value>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    result: Option<Vec<T>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

impl<T> Envelope<T> {
    fn into_first(self, symbol: &str) -> ProviderResult<T> {
        if let Some(error) = self.error {
            if error.code == "Not Found" {
                return Err(ProviderError::symbol_not_found(symbol));
            }
            return Err(match error.description {
                Some(description) => ProviderError::api(format!("{}: {description}", error.code)),
                None => ProviderError::api(error.code),
            });
        }

        self.result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ProviderError::symbol_not_found(symbol))
    }
}

/// Decodes a response body.
///
/// A body that doesn't decode is reported by status when the status was a
/// failure and as malformed otherwise.
fn decode<R: DeserializeOwned>(symbol: &str, status: StatusCode, body: &str) -> ProviderResult<R> {
    serde_json::from_str(body).map_err(|e| {
        if status.is_success() {
            ProviderError::malformed(e.to_string())
        } else {
            ProviderError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            }
        }
    })
}

// === Chart ===

#[derive(Debug, Default, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    events: ChartEvents,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
    #[serde(default)]
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: BTreeMap<String, DividendEvent>,
    #[serde(default)]
    splits: BTreeMap<String, SplitEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    date: i64,
    #[serde(default)]
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SplitEvent {
    date: i64,
    #[serde(default)]
    numerator: Option<f64>,
    #[serde(default)]
    denominator: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteIndicator>,
    #[serde(default)]
    adjclose: Vec<AdjCloseIndicator>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteIndicator {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Default, Deserialize)]
struct AdjCloseIndicator {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn at<T: Copy>(values: &[Option<T>], index: usize) -> Option<T> {
    values.get(index).copied().flatten()
}

fn series_from_chart(chart: &ChartResult, adjusted: bool) -> PriceSeries {
    let empty = QuoteIndicator::default();
    let quote = chart.indicators.quote.first().unwrap_or(&empty);
    let adjclose = chart.indicators.adjclose.first().map(|a| a.adjclose.as_slice());

    let bars = chart.timestamp.iter().enumerate().filter_map(|(i, ts)| {
        let date = local_date(*ts, chart.meta.gmtoffset)?;
        let mut bar = PriceBar {
            date,
            open: at(&quote.open, i),
            high: at(&quote.high, i),
            low: at(&quote.low, i),
            close: at(&quote.close, i),
            volume: at(&quote.volume, i),
        };
        if bar.open.is_none() && bar.high.is_none() && bar.low.is_none() && bar.close.is_none() {
            return None;
        }

        if adjusted {
            let adj = adjclose.and_then(|values| at(values, i));
            if let (Some(adj), Some(close)) = (adj, bar.close) {
                if close != 0.0 {
                    let factor = adj / close;
                    bar.open = bar.open.map(|v| v * factor);
                    bar.high = bar.high.map(|v| v * factor);
                    bar.low = bar.low.map(|v| v * factor);
                    bar.close = Some(adj);
                }
            }
        }
        Some(bar)
    });

    PriceSeries::from_bars(bars).with_timezone(chart.meta.exchange_timezone_name.clone())
}

fn dividends_from_chart(chart: &ChartResult) -> DividendSeries {
    chart
        .events
        .dividends
        .values()
        .filter_map(|event| {
            let amount = event.amount.filter(|a| *a > 0.0)?;
            Some((local_date(event.date, chart.meta.gmtoffset)?, amount))
        })
        .collect()
}

fn splits_from_chart(chart: &ChartResult) -> SplitSeries {
    chart
        .events
        .splits
        .values()
        .filter_map(|event| {
            let numerator = event.numerator.filter(|n| *n > 0.0)?;
            let denominator = event.denominator.filter(|d| *d > 0.0)?;
            Some((
                local_date(event.date, chart.meta.gmtoffset)?,
                numerator / denominator,
            ))
        })
        .collect()
}

// === quoteSummary ===

/// A `{"raw": .., "fmt": ..}` number. Empty objects carry no value.
#[derive(Debug, Default, Deserialize)]
struct RawNumber {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(number: Option<&RawNumber>) -> Option<f64> {
    number.and_then(|n| n.raw)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    currency: Option<String>,
    market_cap: Option<RawNumber>,
    regular_market_price: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    currency: Option<String>,
    market_cap: Option<RawNumber>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawNumber>,
    dividend_yield: Option<RawNumber>,
    payout_ratio: Option<RawNumber>,
    fifty_two_week_high: Option<RawNumber>,
    fifty_two_week_low: Option<RawNumber>,
    price_to_sales_trailing12_months: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatisticsModule {
    price_to_book: Option<RawNumber>,
    enterprise_to_ebitda: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    current_price: Option<RawNumber>,
    return_on_equity: Option<RawNumber>,
    debt_to_equity: Option<RawNumber>,
    current_ratio: Option<RawNumber>,
    quick_ratio: Option<RawNumber>,
    gross_margins: Option<RawNumber>,
    operating_margins: Option<RawNumber>,
    profit_margins: Option<RawNumber>,
}

fn summary_module<T: DeserializeOwned + Default>(
    summary: &Value,
    module: &str,
) -> ProviderResult<T> {
    match summary.get(module) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => T::deserialize(value)
            .map_err(|e| ProviderError::malformed(format!("{module}: {e}"))),
    }
}

fn company_info_from_summary(summary: &Value) -> ProviderResult<CompanyInfo> {
    let price: PriceModule = summary_module(summary, "price")?;
    let detail: SummaryDetailModule = summary_module(summary, "summaryDetail")?;
    let stats: KeyStatisticsModule = summary_module(summary, "defaultKeyStatistics")?;
    let financial: FinancialDataModule = summary_module(summary, "financialData")?;

    Ok(CompanyInfo {
        currency: price.currency.or(detail.currency),
        market_cap: raw(price.market_cap.as_ref()).or_else(|| raw(detail.market_cap.as_ref())),
        regular_market_price: raw(price.regular_market_price.as_ref()),
        current_price: raw(financial.current_price.as_ref()),
        trailing_pe: raw(detail.trailing_pe.as_ref()),
        price_to_book: raw(stats.price_to_book.as_ref()),
        price_to_sales_ttm: raw(detail.price_to_sales_trailing12_months.as_ref()),
        enterprise_to_ebitda: raw(stats.enterprise_to_ebitda.as_ref()),
        return_on_equity: raw(financial.return_on_equity.as_ref()),
        debt_to_equity: raw(financial.debt_to_equity.as_ref()),
        current_ratio: raw(financial.current_ratio.as_ref()),
        quick_ratio: raw(financial.quick_ratio.as_ref()),
        gross_margins: raw(financial.gross_margins.as_ref()),
        operating_margins: raw(financial.operating_margins.as_ref()),
        profit_margins: raw(financial.profit_margins.as_ref()),
        payout_ratio: raw(detail.payout_ratio.as_ref()),
        dividend_yield: raw(detail.dividend_yield.as_ref()),
        fifty_two_week_high: raw(detail.fifty_two_week_high.as_ref()),
        fifty_two_week_low: raw(detail.fifty_two_week_low.as_ref()),
    })
}

/// Reads one statement module. A missing module is an empty statement.
fn statement_from_summary(summary: &Value, module: &str, list_key: &str) -> FinancialStatement {
    let Some(entries) = summary
        .get(module)
        .and_then(|m| m.get(list_key))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            let period_ending = entry
                .get("endDate")
                .and_then(|d| d.get("raw"))
                .and_then(Value::as_i64)
                .and_then(|ts| local_date(ts, 0));

            let items = entry
                .iter()
                .filter(|(key, _)| !matches!(key.as_str(), "maxAge" | "endDate"))
                .map(|(key, value)| {
                    (
                        line_item_name(key),
                        value.get("raw").and_then(Value::as_f64),
                    )
                })
                .collect();

            StatementPeriod {
                period_ending,
                items,
            }
        })
        .collect()
}

/// Adds "Free Cash Flow" from operating cash flow and capital expenditure
/// when the provider doesn't report it.
fn derive_free_cash_flow(period: &mut StatementPeriod) {
    if period.value("Free Cash Flow").is_some() {
        return;
    }
    let operating = period.value("Total Cash From Operating Activities");
    let capex = period.value("Capital Expenditures");
    if let (Some(operating), Some(capex)) = (operating, capex) {
        period
            .items
            .insert("Free Cash Flow".to_string(), Some(operating + capex));
    }
}

/// `totalStockholderEquity` → `Total Stockholder Equity`.
fn line_item_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if i == 0 {
            name.extend(ch.to_uppercase());
        } else if ch.is_uppercase() {
            name.push(' ');
            name.push(ch);
        } else {
            name.push(ch);
        }
    }
    name
}
