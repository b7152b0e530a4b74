//! `get_realtime_quote`.

use serde_json::{Map, Value};

use crate::market::{MarketDataProvider, ProviderError};
use crate::tools::args;
use crate::tools::models::{StockQuote, DEFAULT_CURRENCY};
use crate::tools::ToolError;

fn quote_error(symbol: Option<&str>, message: impl Into<String>) -> ToolError {
    ToolError::new("symbol", symbol, message)
}

fn no_data(symbol: &str) -> ToolError {
    quote_error(
        Some(symbol),
        format!("No data found for symbol '{symbol}'. Are you sure this symbol exists?"),
    )
}

/// Latest price with the change from the previous session.
pub async fn get_realtime_quote(
    provider: &dyn MarketDataProvider,
    arguments: &Map<String, Value>,
) -> Result<StockQuote, ToolError> {
    let Some(symbol) = args::symbol(arguments, "symbol") else {
        return Err(quote_error(None, "Symbol is required"));
    };

    let (info, series) = tokio::try_join!(
        provider.company_info(&symbol),
        provider.recent_bars(&symbol)
    )
    .map_err(|e| match e {
        ProviderError::SymbolNotFound { .. } => no_data(&symbol),
        e => quote_error(
            Some(&symbol),
            format!("Error fetching data for '{symbol}': {e}"),
        ),
    })?;

    let Some(last) = series.bars.last() else {
        return Err(no_data(&symbol));
    };

    let price = last.close;
    let previous = series
        .bars
        .len()
        .checked_sub(2)
        .and_then(|i| series.bars[i].close);

    let (change, change_percent) = match (price, previous) {
        (Some(price), Some(previous)) => {
            let change = price - previous;
            let percent = (previous != 0.0).then(|| change / previous * 100.0);
            (Some(change), percent)
        }
        _ => (None, None),
    };

    Ok(StockQuote {
        symbol,
        price,
        change,
        change_percent,
        volume: last.volume,
        market_cap: info.market_cap,
        pe_ratio: info.trailing_pe,
        dividend_yield: info.dividend_yield,
        fifty_two_week_high: info.fifty_two_week_high,
        fifty_two_week_low: info.fifty_two_week_low,
        currency: info.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    })
}
