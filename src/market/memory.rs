//! In-memory market-data provider.
//!
//! Serves fixed data registered up front. Used for offline runs and tests.
//! Individual calls can be made to fail for a symbol.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::market::error::{ProviderError, ProviderResult};
use crate::market::{
    CompanyInfo, DividendSeries, HistoryQuery, MarketDataProvider, PriceBar, PriceSeries,
    ReportingFrequency, SplitSeries, Statements,
};

/// Number of bars returned by [`MarketDataProvider::recent_bars`].
const RECENT_BARS: usize = 5;

/// Everything the provider knows about one symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolData {
    /// Company snapshot.
    pub info: CompanyInfo,
    /// Daily bars, oldest first.
    pub bars: Vec<PriceBar>,
    /// Exchange timezone reported with bars.
    pub timezone: Option<String>,
    /// Annual statements.
    pub annual: Statements,
    /// Quarterly statements.
    pub quarterly: Statements,
    /// Dividend history.
    pub dividends: DividendSeries,
    /// Split history.
    pub splits: SplitSeries,
}

/// A provider operation, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderCall {
    /// [`MarketDataProvider::company_info`]
    CompanyInfo,
    /// [`MarketDataProvider::recent_bars`]
    RecentBars,
    /// [`MarketDataProvider::price_history`]
    PriceHistory,
    /// [`MarketDataProvider::statements`] with annual frequency
    AnnualStatements,
    /// [`MarketDataProvider::statements`] with quarterly frequency
    QuarterlyStatements,
    /// [`MarketDataProvider::dividends`]
    Dividends,
    /// [`MarketDataProvider::splits`]
    Splits,
}

/// Provider holding its data in memory.
///
/// Unknown symbols fail with [`ProviderError::SymbolNotFound`].
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    symbols: HashMap<String, SymbolData>,
    failures: HashMap<(String, ProviderCall), String>,
    failing_symbols: HashSet<String>,
}

impl InMemoryProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers data for a symbol.
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>, data: SymbolData) -> Self {
        self.symbols.insert(symbol.into(), data);
        self
    }

    /// Makes one call fail for a symbol with a provider-reported error.
    #[must_use]
    pub fn with_failure(
        mut self,
        symbol: impl Into<String>,
        call: ProviderCall,
        message: impl Into<String>,
    ) -> Self {
        self.failures.insert((symbol.into(), call), message.into());
        self
    }

    /// Makes every call fail for a symbol with a transport-level status error.
    #[must_use]
    pub fn with_unavailable(mut self, symbol: impl Into<String>) -> Self {
        self.failing_symbols.insert(symbol.into());
        self
    }

    fn lookup(&self, symbol: &str, call: ProviderCall) -> ProviderResult<&SymbolData> {
        if self.failing_symbols.contains(symbol) {
            return Err(ProviderError::Status {
                symbol: symbol.to_string(),
                status: 503,
            });
        }
        if let Some(message) = self.failures.get(&(symbol.to_string(), call)) {
            return Err(ProviderError::api(message.clone()));
        }
        self.symbols
            .get(symbol)
            .ok_or_else(|| ProviderError::symbol_not_found(symbol))
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryProvider {
    async fn company_info(&self, symbol: &str) -> ProviderResult<CompanyInfo> {
        Ok(self.lookup(symbol, ProviderCall::CompanyInfo)?.info.clone())
    }

    async fn recent_bars(&self, symbol: &str) -> ProviderResult<PriceSeries> {
        let data = self.lookup(symbol, ProviderCall::RecentBars)?;
        let skip = data.bars.len().saturating_sub(RECENT_BARS);
        Ok(PriceSeries::from_bars(data.bars.iter().skip(skip).cloned())
            .with_timezone(data.timezone.clone()))
    }

    /// Returns the stored bars within `[start, end]`. The interval and the
    /// adjustment flag are not applied.
    async fn price_history(
        &self,
        symbol: &str,
        query: &HistoryQuery,
    ) -> ProviderResult<PriceSeries> {
        let data = self.lookup(symbol, ProviderCall::PriceHistory)?;
        let bars = data
            .bars
            .iter()
            .filter(|bar| bar.date >= query.start && bar.date <= query.end)
            .cloned();
        Ok(PriceSeries::from_bars(bars).with_timezone(data.timezone.clone()))
    }

    async fn statements(
        &self,
        symbol: &str,
        frequency: ReportingFrequency,
    ) -> ProviderResult<Statements> {
        let statements = match frequency {
            ReportingFrequency::Annual => {
                &self.lookup(symbol, ProviderCall::AnnualStatements)?.annual
            }
            ReportingFrequency::Quarterly => {
                &self.lookup(symbol, ProviderCall::QuarterlyStatements)?.quarterly
            }
        };
        Ok(statements.clone())
    }

    async fn dividends(&self, symbol: &str) -> ProviderResult<DividendSeries> {
        Ok(self.lookup(symbol, ProviderCall::Dividends)?.dividends.clone())
    }

    async fn splits(&self, symbol: &str) -> ProviderResult<SplitSeries> {
        Ok(self.lookup(symbol, ProviderCall::Splits)?.splits.clone())
    }
}
