//! Dividend-reinvested total-return index.

use chrono::NaiveDate;

use crate::market::{DividendSeries, PriceBar};
use crate::metrics::round_to;

/// Starting value of the index.
pub const BASE_INDEX: f64 = 100.0;

/// One point of the total-return index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotalReturnPoint {
    /// Bar date.
    pub date: NaiveDate,
    /// Index value, rounded to 4 decimals.
    pub value: f64,
}

/// Computes the total-return index over `bars`.
///
/// The first bar with a close is pinned at [`BASE_INDEX`]. Each later bar
/// moves the index by its price return plus, when a positive dividend has an
/// ex-date equal to the bar's date, the dividend yield on the previous close.
///
/// Bars without a close are skipped and do not replace the previous close, so
/// the return of the next bar is measured across the gap. Dividends falling on
/// non-trading days never match a bar.
#[must_use]
pub fn total_return_index(bars: &[PriceBar], dividends: &DividendSeries) -> Vec<TotalReturnPoint> {
    let mut points = Vec::with_capacity(bars.len());
    let mut index = BASE_INDEX;
    let mut prev_close: Option<f64> = None;

    for bar in bars {
        let Some(close) = bar.close else {
            continue;
        };

        if let Some(prev) = prev_close {
            let price_return = close / prev - 1.0;
            let dividend_yield = dividends
                .get(bar.date)
                .filter(|amount| *amount > 0.0)
                .map_or(0.0, |amount| amount / prev);
            index *= 1.0 + price_return + dividend_yield;
        }

        points.push(TotalReturnPoint {
            date: bar.date,
            value: round_to(index, 4),
        });
        prev_close = Some(close);
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn bars(closes: &[Option<f64>]) -> Vec<PriceBar> {
        closes
            .iter()
            .zip(1..)
            .map(|(close, day)| PriceBar::close_only(date(day), *close))
            .collect()
    }

    fn values(points: &[TotalReturnPoint]) -> Vec<f64> {
        points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn empty_input() {
        assert!(total_return_index(&[], &DividendSeries::new()).is_empty());
    }

    #[test]
    fn price_only_index_tracks_price() {
        let bars = bars(&[Some(100.0), Some(102.0), Some(101.0), Some(103.0), Some(105.0)]);
        let points = total_return_index(&bars, &DividendSeries::new());

        assert_eq!(values(&points), vec![100.0, 102.0, 101.0, 103.0, 105.0]);
        assert_eq!(points[4].date, date(5));
    }

    #[test]
    fn first_point_is_base_regardless_of_price() {
        let points = total_return_index(&bars(&[Some(37.5)]), &DividendSeries::new());
        assert_eq!(values(&points), vec![100.0]);
    }

    #[test]
    fn dividend_on_bar_date_is_reinvested() {
        let bars = bars(&[Some(100.0), Some(100.0)]);
        let dividends: DividendSeries = [(date(2), 1.0)].into_iter().collect();

        let points = total_return_index(&bars, &dividends);
        assert_eq!(values(&points), vec![100.0, 101.0]);
    }

    #[test]
    fn dividend_off_trading_day_is_ignored() {
        let bars = vec![
            PriceBar::close_only(date(5), Some(100.0)),
            PriceBar::close_only(date(8), Some(100.0)),
        ];
        let dividends: DividendSeries = [(date(6), 1.0)].into_iter().collect();

        let points = total_return_index(&bars, &dividends);
        assert_eq!(values(&points), vec![100.0, 100.0]);
    }

    #[test]
    fn dividend_on_first_bar_is_ignored() {
        let bars = bars(&[Some(100.0), Some(110.0)]);
        let dividends: DividendSeries = [(date(1), 5.0)].into_iter().collect();

        let points = total_return_index(&bars, &dividends);
        assert_eq!(values(&points), vec![100.0, 110.0]);
    }

    #[test]
    fn missing_close_keeps_previous_close() {
        let bars = bars(&[Some(100.0), None, Some(110.0)]);
        let points = total_return_index(&bars, &DividendSeries::new());

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].date, date(3));
        assert_eq!(values(&points), vec![100.0, 110.0]);
    }

    #[test]
    fn leading_missing_close_moves_the_base() {
        let bars = bars(&[None, Some(50.0), Some(55.0)]);
        let points = total_return_index(&bars, &DividendSeries::new());

        assert_eq!(points[0].date, date(2));
        assert_eq!(values(&points), vec![100.0, 110.0]);
    }

    #[test]
    fn running_index_is_not_rounded() {
        let bars = bars(&[Some(3.0), Some(3.00001), Some(3.00002)]);
        let points = total_return_index(&bars, &DividendSeries::new());

        // 100 * 3.00002 / 3 = 100.000666..; rounding each step would give 100.0006.
        assert_eq!(points[2].value, 100.0007);
    }
}
