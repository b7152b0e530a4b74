//! `get_price_history`.

use serde_json::{Map, Value};

use crate::market::{EventSeries, HistoryQuery, Interval, MarketDataProvider, ProviderError};
use crate::metrics::total_return_index;
use crate::tools::args;
use crate::tools::models::{
    dated_events, iso_date, PriceAdjustments, PriceBarRecord, PriceHistory, TotalReturnRecord,
};
use crate::tools::ToolError;

/// Timezone reported when the provider gives none.
const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Longest span, in days, accepted for the `1m` interval.
const MONTHLY_MAX_SPAN_DAYS: i64 = 30;

/// Bars over `[start, end]` with an optional total-return index and the
/// dividends and splits falling inside the window.
pub async fn get_price_history(
    provider: &dyn MarketDataProvider,
    arguments: &Map<String, Value>,
) -> Result<PriceHistory, ToolError> {
    let Some(symbol) = args::symbol(arguments, "instrument") else {
        return Err(ToolError::instrument(
            None,
            "Instrument (ticker symbol) is required",
        ));
    };
    let invalid = |message: String| ToolError::instrument(Some(&symbol), message);

    let (Some(start), Some(end)) = (args::text(arguments, "start"), args::text(arguments, "end"))
    else {
        return Err(invalid(
            "Both start and end dates are required (YYYY-MM-DD format)".to_string(),
        ));
    };

    let interval = match arguments.get("interval") {
        None | Some(Value::Null) => Some(Interval::Daily),
        Some(value) => value.as_str().and_then(|s| s.parse().ok()),
    }
    .ok_or_else(|| invalid("Interval must be one of: 1d, 1w, 1m".to_string()))?;

    let adjusted = args::flag(arguments, "adjusted", true).map_err(invalid)?;
    let include_total_return =
        args::flag(arguments, "include_total_return", true).map_err(invalid)?;

    let start = args::date(start).map_err(invalid)?;
    let end = args::date(end).map_err(invalid)?;
    if start > end {
        return Err(invalid(format!(
            "Start date {} is after end date {}",
            iso_date(start),
            iso_date(end)
        )));
    }

    let span = (end - start).num_days();
    if interval == Interval::Monthly && span > MONTHLY_MAX_SPAN_DAYS {
        return Err(invalid(format!(
            "1m interval data is only available for spans of up to 30 days. Your requested \
             period is {span} days. Use '1d' or '1w' for longer periods."
        )));
    }

    let query = HistoryQuery {
        start,
        end,
        interval,
        adjusted,
    };
    let no_data = || {
        invalid(format!(
            "No price data found for '{symbol}' in the specified period ({} to {}) with \
             interval '{interval}'. Check the ticker symbol, the interval limits and market \
             closure dates.",
            iso_date(start),
            iso_date(end)
        ))
    };

    let series = match provider.price_history(&symbol, &query).await {
        Ok(series) => series,
        Err(ProviderError::SymbolNotFound { .. }) => return Err(no_data()),
        Err(e) => {
            return Err(invalid(format!(
                "Error fetching price history for '{symbol}': {e}. Check if the ticker symbol \
                 is valid and the date range is supported."
            )))
        }
    };
    if series.is_empty() {
        return Err(no_data());
    }

    let (dividends, splits) = tokio::join!(provider.dividends(&symbol), provider.splits(&symbol));
    let dividends = events_or_empty(&symbol, "dividends", dividends).within(start, end);
    let splits = events_or_empty(&symbol, "splits", splits).within(start, end);

    let total_return = if include_total_return {
        total_return_index(&series.bars, &dividends)
            .iter()
            .map(TotalReturnRecord::from)
            .collect()
    } else {
        Vec::new()
    };

    Ok(PriceHistory {
        bars: series.bars.iter().map(PriceBarRecord::from).collect(),
        total_return,
        adjustments: PriceAdjustments {
            splits: dated_events(&splits),
            dividends: dated_events(&dividends),
            ..PriceAdjustments::default()
        },
        tz: series
            .timezone
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        interval: interval.as_str().to_string(),
        start_date: iso_date(start),
        end_date: iso_date(end),
        symbol,
    })
}

/// Unwraps an event fetch, treating failure as no events.
pub(super) fn events_or_empty(
    symbol: &str,
    kind: &str,
    events: Result<EventSeries, ProviderError>,
) -> EventSeries {
    events.unwrap_or_else(|e| {
        tracing::warn!(symbol, kind, error = %e, "Corporate events unavailable");
        EventSeries::new()
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::market::{InMemoryProvider, PriceBar, ProviderCall, SymbolData};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn provider() -> InMemoryProvider {
        let closes = [100.0, 102.0, 101.0, 103.0, 105.0];
        let bars = closes
            .iter()
            .zip(1..)
            .map(|(close, day)| PriceBar::close_only(date(3, day), Some(*close)))
            .collect();
        InMemoryProvider::new().with_symbol(
            "SPY",
            SymbolData {
                bars,
                dividends: [(date(2, 20), 1.5), (date(3, 3), 1.0)].into_iter().collect(),
                splits: [(date(3, 4), 2.0)].into_iter().collect(),
                ..SymbolData::default()
            },
        )
    }

    fn request(extra: Value) -> Map<String, Value> {
        let mut a = args(json!({"instrument": "spy", "start": "2024-03-01", "end": "2024-03-05"}));
        if let Value::Object(extra) = extra {
            a.extend(extra);
        }
        a
    }

    #[tokio::test]
    async fn bars_total_return_and_adjustments() {
        let out = get_price_history(&provider(), &request(json!({}))).await.unwrap();

        assert_eq!(out.symbol, "SPY");
        assert_eq!(out.bars.len(), 5);
        assert_eq!(out.bars[0].t, "2024-03-01");
        assert_eq!(out.total_return.len(), 5);
        assert_eq!(out.total_return[0].tr, Some(100.0));
        // The dividend offsets the price drop on the 3rd.
        assert_eq!(out.total_return[2].tr, Some(102.0));
        assert_eq!(out.adjustments.dividends.len(), 1);
        assert_eq!(out.adjustments.dividends["2024-03-03"], 1.0);
        assert_eq!(out.adjustments.splits["2024-03-04"], 2.0);
        assert!(out.adjustments.stock_splits.is_empty());
        assert_eq!(out.tz, "America/New_York");
        assert_eq!(out.interval, "1d");
        assert_eq!(out.start_date, "2024-03-01");
        assert_eq!(out.end_date, "2024-03-05");
    }

    #[tokio::test]
    async fn total_return_can_be_skipped() {
        let a = request(json!({"include_total_return": false, "adjusted": false}));
        let out = get_price_history(&provider(), &a).await.unwrap();

        assert!(out.total_return.is_empty());
        assert_eq!(out.bars.len(), 5);
    }

    #[tokio::test]
    async fn end_date_is_inclusive() {
        let a = request(json!({"end": "2024-03-03"}));
        let out = get_price_history(&provider(), &a).await.unwrap();
        assert_eq!(out.bars.last().unwrap().t, "2024-03-03");
    }

    #[tokio::test]
    async fn event_failures_leave_adjustments_empty() {
        let provider = provider()
            .with_failure("SPY", ProviderCall::Dividends, "down")
            .with_failure("SPY", ProviderCall::Splits, "down");
        let out = get_price_history(&provider, &request(json!({}))).await.unwrap();

        assert!(out.adjustments.dividends.is_empty());
        assert!(out.adjustments.splits.is_empty());
        assert_eq!(out.total_return[2].tr, Some(101.0));
    }

    #[tokio::test]
    async fn monthly_interval_span_limit() {
        let a = request(json!({"interval": "1m", "start": "2024-01-01", "end": "2024-03-01"}));
        let err = get_price_history(&provider(), &a).await.unwrap_err();
        assert!(err.message().contains("60 days"));

        let a = request(json!({"interval": "1m", "start": "2024-03-01", "end": "2024-03-31"}));
        let out = get_price_history(&provider(), &a).await.unwrap();
        assert_eq!(out.interval, "1m");
    }

    #[tokio::test]
    async fn argument_validation() {
        let cases = [
            (json!({"instrument": ""}), "Instrument (ticker symbol) is required"),
            (
                json!({"start": null}),
                "Both start and end dates are required (YYYY-MM-DD format)",
            ),
            (json!({"interval": "1h"}), "Interval must be one of: 1d, 1w, 1m"),
            (
                json!({"adjusted": "yes"}),
                "'adjusted' must be a boolean (true or false)",
            ),
        ];
        for (extra, message) in cases {
            let err = get_price_history(&provider(), &request(extra))
                .await
                .unwrap_err();
            assert_eq!(err.message(), message);
        }

        let err = get_price_history(&provider(), &request(json!({"start": "2024/03/01"})))
            .await
            .unwrap_err();
        assert!(err.message().starts_with("Invalid date format"));

        let err = get_price_history(&provider(), &request(json!({"start": "2024-04-01"})))
            .await
            .unwrap_err();
        assert!(err.message().contains("after end date"));
    }

    #[tokio::test]
    async fn empty_window_and_unknown_symbol() {
        let a = request(json!({"start": "2023-01-01", "end": "2023-01-31"}));
        let err = get_price_history(&provider(), &a).await.unwrap_err();
        assert!(err.message().starts_with("No price data found for 'SPY'"));

        let err = get_price_history(&InMemoryProvider::new(), &request(json!({})))
            .await
            .unwrap_err();
        assert!(err.message().starts_with("No price data found for 'SPY'"));
        assert_eq!(err.to_payload()["instrument"], "SPY");
    }

    #[tokio::test]
    async fn provider_failure() {
        let provider = provider().with_failure("SPY", ProviderCall::PriceHistory, "timeout");
        let err = get_price_history(&provider, &request(json!({}))).await.unwrap_err();
        assert!(err
            .message()
            .starts_with("Error fetching price history for 'SPY': provider error: timeout"));
    }
}
