//! Market-data access.
//!
//! The [`MarketDataProvider`] trait is the seam between the tools and the
//! outside world. Every call goes straight to the provider: there is no cache
//! and no retry, and each failure is returned to the caller as-is.
//!
//! Two implementations are provided:
//!
//! - [`YahooProvider`]: Yahoo Finance public query endpoints over HTTP
//! - [`InMemoryProvider`]: fixed data held in memory (offline use and tests)

pub mod error;
pub mod memory;
pub mod yahoo;

pub use error::{ProviderError, ProviderResult};
pub use memory::{InMemoryProvider, ProviderCall, SymbolData};
pub use yahoo::YahooProvider;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;

/// One OHLCV bar. Any value may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    /// Session date in the exchange's local time.
    pub date: NaiveDate,
    /// Opening price.
    pub open: Option<f64>,
    /// High price.
    pub high: Option<f64>,
    /// Low price.
    pub low: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Traded volume.
    pub volume: Option<u64>,
}

impl PriceBar {
    /// Creates a bar with only a closing price.
    #[must_use]
    pub const fn close_only(date: NaiveDate, close: Option<f64>) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }
}

/// Bars in strictly increasing date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    /// The bars, oldest first.
    pub bars: Vec<PriceBar>,
    /// IANA name of the exchange timezone, when known.
    pub timezone: Option<String>,
}

impl PriceSeries {
    /// Builds a series from bars, keeping dates strictly increasing.
    ///
    /// A bar dated on or before its predecessor replaces it when the dates are
    /// equal and is dropped otherwise.
    #[must_use]
    pub fn from_bars(bars: impl IntoIterator<Item = PriceBar>) -> Self {
        let mut ordered: Vec<PriceBar> = Vec::new();
        for bar in bars {
            match ordered.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                Some(last) if last.date > bar.date => {}
                _ => ordered.push(bar),
            }
        }
        Self {
            bars: ordered,
            timezone: None,
        }
    }

    /// Attaches an exchange timezone.
    #[must_use]
    pub fn with_timezone(mut self, timezone: Option<String>) -> Self {
        self.timezone = timezone;
        self
    }

    /// Returns the number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Returns `true` if the series has no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Date-keyed corporate events (dividend cash amounts or split factors).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSeries(BTreeMap<NaiveDate, f64>);

/// Ex-dividend date → cash amount per share.
pub type DividendSeries = EventSeries;

/// Effective date → split factor (2.0 for a 2-for-1 split).
pub type SplitSeries = EventSeries;

impl EventSeries {
    /// Creates an empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Records an event. Two events on one date are summed.
    pub fn insert(&mut self, date: NaiveDate, value: f64) {
        *self.0.entry(date).or_insert(0.0) += value;
    }

    /// Returns the value recorded on `date`.
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.0.get(&date).copied()
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates events in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.0.iter().map(|(date, value)| (*date, *value))
    }

    /// Date of the earliest event.
    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.0.keys().next().copied()
    }

    /// Date of the latest event.
    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.0.keys().next_back().copied()
    }

    /// Returns the events dated within `[start, end]`.
    #[must_use]
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> Self {
        if start > end {
            return Self::new();
        }
        Self(
            self.0
                .range(start..=end)
                .map(|(date, value)| (*date, *value))
                .collect(),
        )
    }

    /// Sums the events per calendar year.
    #[must_use]
    pub fn annual_totals(&self) -> BTreeMap<i32, f64> {
        let mut totals = BTreeMap::new();
        for (date, value) in &self.0 {
            *totals.entry(date.year()).or_insert(0.0) += value;
        }
        totals
    }
}

impl FromIterator<(NaiveDate, f64)> for EventSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        let mut series = Self::new();
        for (date, value) in iter {
            series.insert(date, value);
        }
        series
    }
}

/// One reporting period of a financial statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementPeriod {
    /// Last day of the period.
    pub period_ending: Option<NaiveDate>,
    /// Line item → value, in provider order. `None` marks a reported but
    /// empty line.
    pub items: IndexMap<String, Option<f64>>,
}

impl StatementPeriod {
    /// Returns the value of a line item, if reported.
    #[must_use]
    pub fn value(&self, item: &str) -> Option<f64> {
        self.items.get(item).copied().flatten()
    }
}

/// Reporting periods, most recent first.
pub type FinancialStatement = Vec<StatementPeriod>;

/// The three primary statements for one reporting frequency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statements {
    /// Income statements.
    pub income: FinancialStatement,
    /// Balance sheets.
    pub balance: FinancialStatement,
    /// Cash-flow statements.
    pub cashflow: FinancialStatement,
}

impl Statements {
    /// Keeps at most `periods` of the most recent periods of each statement.
    pub fn truncate(&mut self, periods: usize) {
        self.income.truncate(periods);
        self.balance.truncate(periods);
        self.cashflow.truncate(periods);
    }
}

/// Statement reporting frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingFrequency {
    /// Fiscal-year statements.
    Annual,
    /// Fiscal-quarter statements.
    Quarterly,
}

/// Bar granularity for price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    /// One bar per trading day.
    Daily,
    /// One bar per week.
    Weekly,
    /// One bar per month.
    Monthly,
}

impl Interval {
    /// All intervals, in the order they are advertised.
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    /// Returns the wire name (`1d`, `1w`, `1m`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1w",
            Self::Monthly => "1m",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| format!("unknown interval '{s}'"))
    }
}

/// Parameters of a historical price request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    /// First date, inclusive.
    pub start: NaiveDate,
    /// Last date, inclusive.
    pub end: NaiveDate,
    /// Bar granularity.
    pub interval: Interval,
    /// Return split- and dividend-adjusted prices.
    pub adjusted: bool,
}

/// Scalar company snapshot. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyInfo {
    /// Trading currency.
    pub currency: Option<String>,
    /// Market capitalisation.
    pub market_cap: Option<f64>,
    /// Latest regular-session price.
    pub regular_market_price: Option<f64>,
    /// Current price as reported with the financial data.
    pub current_price: Option<f64>,
    /// Trailing twelve-month P/E.
    pub trailing_pe: Option<f64>,
    /// Price to book.
    pub price_to_book: Option<f64>,
    /// Price to trailing twelve-month sales.
    pub price_to_sales_ttm: Option<f64>,
    /// Enterprise value to EBITDA.
    pub enterprise_to_ebitda: Option<f64>,
    /// Return on equity.
    pub return_on_equity: Option<f64>,
    /// Debt to equity.
    pub debt_to_equity: Option<f64>,
    /// Current ratio.
    pub current_ratio: Option<f64>,
    /// Quick ratio.
    pub quick_ratio: Option<f64>,
    /// Gross margin.
    pub gross_margins: Option<f64>,
    /// Operating margin.
    pub operating_margins: Option<f64>,
    /// Net profit margin.
    pub profit_margins: Option<f64>,
    /// Dividend payout ratio.
    pub payout_ratio: Option<f64>,
    /// Dividend yield.
    pub dividend_yield: Option<f64>,
    /// 52-week high.
    pub fifty_two_week_high: Option<f64>,
    /// 52-week low.
    pub fifty_two_week_low: Option<f64>,
}

/// Source of quotes, history, statements and corporate events.
///
/// Symbols are passed upper-cased and trimmed.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Scalar company snapshot.
    async fn company_info(&self, symbol: &str) -> ProviderResult<CompanyInfo>;

    /// The last few daily bars, oldest first, unadjusted.
    async fn recent_bars(&self, symbol: &str) -> ProviderResult<PriceSeries>;

    /// Bars over a date range.
    async fn price_history(&self, symbol: &str, query: &HistoryQuery)
        -> ProviderResult<PriceSeries>;

    /// Income, balance-sheet and cash-flow statements, most recent first.
    async fn statements(
        &self,
        symbol: &str,
        frequency: ReportingFrequency,
    ) -> ProviderResult<Statements>;

    /// Full dividend history.
    async fn dividends(&self, symbol: &str) -> ProviderResult<DividendSeries>;

    /// Full split history.
    async fn splits(&self, symbol: &str) -> ProviderResult<SplitSeries>;
}
