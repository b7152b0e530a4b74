//! Tool output records.
//!
//! These serialise to the JSON documents returned as tool text. Absent
//! values are written as `null`. Dates are `YYYY-MM-DD` strings.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

use crate::market::{EventSeries, PriceBar, StatementPeriod};
use crate::metrics::{
    round_to, DividendGrowthMetrics, DividendYieldMetrics, RatioSet, TotalReturnPoint,
};

/// Currency reported when the provider gives none.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Formats a date as `YYYY-MM-DD`.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Output of `get_realtime_quote`.
#[derive(Debug, Clone, Serialize)]
pub struct StockQuote {
    pub symbol: String,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub currency: String,
}

/// One reporting period of a statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementRecord {
    pub period_ending: Option<String>,
    pub currency: Option<String>,
    pub data: IndexMap<String, Option<f64>>,
}

impl StatementRecord {
    /// Converts a provider period.
    pub fn from_period(period: &StatementPeriod, currency: &str) -> Self {
        Self {
            period_ending: period.period_ending.map(iso_date),
            currency: Some(currency.to_string()),
            data: period.items.clone(),
        }
    }
}

/// Metadata of a fundamentals response.
#[derive(Debug, Clone, Serialize)]
pub struct FundamentalsMetadata {
    pub currency: Option<String>,
    pub as_of: Option<String>,
    pub period_type: String,
    pub years_requested: i64,
}

/// Output of `get_fundamentals`.
#[derive(Debug, Clone, Serialize)]
pub struct StockFundamentals {
    pub symbol: String,
    pub income: Vec<StatementRecord>,
    pub balance: Vec<StatementRecord>,
    pub cashflow: Vec<StatementRecord>,
    pub ratios: RatioSet,
    pub meta: FundamentalsMetadata,
}

/// One OHLCV bar, keyed with single letters.
#[derive(Debug, Clone, Serialize)]
pub struct PriceBarRecord {
    pub t: String,
    pub o: Option<f64>,
    pub h: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
    pub v: Option<u64>,
}

impl From<&PriceBar> for PriceBarRecord {
    fn from(bar: &PriceBar) -> Self {
        Self {
            t: iso_date(bar.date),
            o: bar.open,
            h: bar.high,
            l: bar.low,
            c: bar.close,
            v: bar.volume,
        }
    }
}

/// One total-return index point.
#[derive(Debug, Clone, Serialize)]
pub struct TotalReturnRecord {
    pub t: String,
    pub tr: Option<f64>,
}

impl From<&TotalReturnPoint> for TotalReturnRecord {
    fn from(point: &TotalReturnPoint) -> Self {
        Self {
            t: iso_date(point.date),
            tr: Some(point.value),
        }
    }
}

/// Corporate events inside a price-history window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PriceAdjustments {
    pub splits: BTreeMap<String, f64>,
    pub dividends: BTreeMap<String, f64>,
    pub stock_splits: BTreeMap<String, f64>,
}

/// Date-keyed view of an event series.
pub fn dated_events(events: &EventSeries) -> BTreeMap<String, f64> {
    events.iter().map(|(date, value)| (iso_date(date), value)).collect()
}

/// Output of `get_price_history`.
#[derive(Debug, Clone, Serialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub bars: Vec<PriceBarRecord>,
    pub total_return: Vec<TotalReturnRecord>,
    pub adjustments: PriceAdjustments,
    pub tz: String,
    pub interval: String,
    pub start_date: String,
    pub end_date: String,
}

/// One dividend payment.
#[derive(Debug, Clone, Serialize)]
pub struct DividendRecord {
    pub ex_date: String,
    pub amount: f64,
    pub currency: String,
}

impl DividendRecord {
    /// Builds a record with the amount rounded to 4 decimals.
    pub fn new(ex_date: NaiveDate, amount: f64, currency: &str) -> Self {
        Self {
            ex_date: iso_date(ex_date),
            amount: round_to(amount, 4),
            currency: currency.to_string(),
        }
    }
}

/// A corporate action. Only splits are reported.
#[derive(Debug, Clone, Serialize)]
pub struct CorporateAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub effective_date: String,
    pub factor: Option<f64>,
    pub description: Option<String>,
}

impl CorporateAction {
    /// Builds a split action. `2.0` is a 2-for-1 split.
    pub fn split(effective_date: NaiveDate, factor: f64) -> Self {
        Self {
            kind: "split".to_string(),
            effective_date: iso_date(effective_date),
            factor: Some(round_to(factor, 4)),
            description: Some(format!("Stock split {factor:?}:1")),
        }
    }
}

/// Output of `get_dividends_and_actions`.
#[derive(Debug, Clone, Serialize)]
pub struct DividendsAndActions {
    pub symbol: String,
    pub dividends: Vec<DividendRecord>,
    pub yield_metrics: DividendYieldMetrics,
    pub growth_metrics: DividendGrowthMetrics,
    pub actions: Vec<CorporateAction>,
    pub period_start: String,
    pub period_end: String,
}
