//! `get_dividends_and_actions`.

use chrono::{Days, NaiveDate};
use serde_json::{Map, Value};

use crate::market::{CompanyInfo, MarketDataProvider};
use crate::metrics::{growth_metrics, yield_metrics};
use crate::tools::args;
use crate::tools::models::{
    iso_date, CorporateAction, DividendRecord, DividendsAndActions, DEFAULT_CURRENCY,
};
use crate::tools::price_history::events_or_empty;
use crate::tools::ToolError;

/// Default look-back when no start date is given.
const DEFAULT_WINDOW_DAYS: u64 = 3650;

/// Dividend payments and splits over a window, with yield and growth
/// metrics computed from the payments inside it.
pub async fn get_dividends_and_actions(
    provider: &dyn MarketDataProvider,
    arguments: &Map<String, Value>,
    today: NaiveDate,
) -> Result<DividendsAndActions, ToolError> {
    let Some(symbol) = args::symbol(arguments, "instrument") else {
        return Err(ToolError::instrument(
            None,
            "Instrument (ticker symbol) is required",
        ));
    };
    let invalid = |message: String| ToolError::instrument(Some(&symbol), message);

    let end = match args::text(arguments, "end") {
        Some(end) => args::date(end).map_err(invalid)?,
        None => today,
    };
    let start = match args::text(arguments, "start") {
        Some(start) => args::date(start).map_err(invalid)?,
        None => today
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
            .unwrap_or(NaiveDate::MIN),
    };

    let (dividends, splits, info) = tokio::join!(
        provider.dividends(&symbol),
        provider.splits(&symbol),
        provider.company_info(&symbol)
    );
    let dividends = events_or_empty(&symbol, "dividends", dividends).within(start, end);
    let splits = events_or_empty(&symbol, "splits", splits).within(start, end);
    let info = info.unwrap_or_else(|e| {
        tracing::warn!(symbol = %symbol, error = %e, "Company info unavailable, yield metrics skipped");
        CompanyInfo::default()
    });

    let price = current_price(&info);
    let currency = info.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);

    Ok(DividendsAndActions {
        dividends: dividends
            .iter()
            .map(|(date, amount)| DividendRecord::new(date, amount, currency))
            .collect(),
        yield_metrics: yield_metrics(&dividends, price, today),
        growth_metrics: growth_metrics(&dividends),
        actions: splits
            .iter()
            .map(|(date, factor)| CorporateAction::split(date, factor))
            .collect(),
        period_start: iso_date(start),
        period_end: iso_date(end),
        symbol,
    })
}

/// Regular-market price, falling back to the current price, else 0.
fn current_price(info: &CompanyInfo) -> f64 {
    info.regular_market_price
        .filter(|price| *price != 0.0)
        .or(info.current_price)
        .unwrap_or(0.0)
}
