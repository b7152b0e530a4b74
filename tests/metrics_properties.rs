//! Property and edge case tests for the financial metrics.
//!
//! These tests sweep generated series through the public metrics API and
//! check the invariants that must hold for any input.

use chrono::{Days, NaiveDate};
use stockmcp::market::{CompanyInfo, DividendSeries, PriceBar, StatementPeriod};
use stockmcp::metrics::{
    consistency_score, derive_ratios, dividend_cagr, growth_metrics, round_to,
    total_return_index, try_derive_ratios, yield_metrics, MetricsError, RatioSet, BASE_INDEX,
};

fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .checked_add_days(Days::new(n))
        .unwrap()
}

/// A deterministic walk of `len` closes starting at `start`.
fn closes(len: usize, start: f64, seed: u64) -> Vec<f64> {
    let mut state = seed;
    let mut price = start;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            #[allow(clippy::cast_precision_loss)]
            let step = ((state >> 33) % 200) as f64 / 100.0 - 1.0;
            price = (price + step).max(1.0);
            price
        })
        .collect()
}

fn bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .zip(0..)
        .map(|(close, n)| PriceBar::close_only(day(n), Some(*close)))
        .collect()
}

// =============================================================================
// Total Return Index
// =============================================================================

#[test]
fn test_total_return_starts_at_base() {
    for seed in 0..20 {
        let closes = closes(50, 40.0 + f64::from(u32::try_from(seed).unwrap()), seed);
        let index = total_return_index(&bars(&closes), &DividendSeries::new());
        assert_eq!(index[0].value, BASE_INDEX);
        assert_eq!(index.len(), closes.len());
    }
}

#[test]
fn test_total_return_without_dividends_tracks_price() {
    for seed in 0..20 {
        let closes = closes(60, 75.0, seed);
        let index = total_return_index(&bars(&closes), &DividendSeries::new());

        for (point, close) in index.iter().zip(&closes) {
            let expected = BASE_INDEX * close / closes[0];
            assert!(
                (point.value - expected).abs() < 1e-3,
                "seed {seed}: {} vs {expected}",
                point.value
            );
        }
    }
}

#[test]
fn test_dividends_never_lower_the_index() {
    let closes = closes(40, 50.0, 7);
    let bars = bars(&closes);
    let dividends: DividendSeries = (0..40).step_by(10).map(|n| (day(n), 0.5)).collect();

    let plain = total_return_index(&bars, &DividendSeries::new());
    let with_dividends = total_return_index(&bars, &dividends);

    for (a, b) in plain.iter().zip(&with_dividends) {
        assert!(b.value >= a.value - 1e-9);
    }
    assert!(with_dividends.last().unwrap().value > plain.last().unwrap().value);
}

#[test]
fn test_total_return_skips_missing_closes() {
    let mut bars = bars(&[100.0, 110.0, 121.0]);
    bars.insert(1, PriceBar::close_only(day(10), None));

    let index = total_return_index(&bars, &DividendSeries::new());
    assert_eq!(index.len(), 3);
    assert_eq!(index[2].value, 121.0);
}

// =============================================================================
// Dividend Metrics
// =============================================================================

#[test]
fn test_consistency_score_is_bounded() {
    for cuts in 0..8_u32 {
        let dividends: DividendSeries = (0..8_u32)
            .map(|year| {
                let amount = if year < cuts { 1.0 / f64::from(year + 1) } else { 0.1 };
                let date = NaiveDate::from_ymd_opt(2010 + i32::try_from(year).unwrap(), 6, 1);
                (date.unwrap(), amount)
            })
            .collect();

        let score = consistency_score(&dividends).unwrap();
        assert!((0.0..=100.0).contains(&score), "score {score}");
    }
}

#[test]
fn test_cagr_of_constant_dividends_is_zero() {
    let dividends: DividendSeries = (2015..2021)
        .map(|year| (NaiveDate::from_ymd_opt(year, 3, 1).unwrap(), 0.75))
        .collect();

    for years in 1..=5 {
        assert_eq!(dividend_cagr(&dividends, f64::from(years)), Some(0.0));
    }
    assert_eq!(dividend_cagr(&dividends, 0.0), None);
}

#[test]
fn test_growth_metrics_need_a_year_of_history() {
    let dividends: DividendSeries = [(day(0), 1.0), (day(300), 1.0)].into_iter().collect();
    let metrics = growth_metrics(&dividends);

    assert_eq!(metrics.cagr_5y, None);
    assert_eq!(metrics.consistency_score, None);
}

#[test]
fn test_yield_metrics_need_a_positive_price() {
    let dividends: DividendSeries = (0..8).map(|q| (day(q * 90), 0.5)).collect();

    for price in [0.0, -10.0] {
        let metrics = yield_metrics(&dividends, price, day(720));
        assert_eq!(metrics.ttm, None);
        assert_eq!(metrics.five_year_avg, None);
    }

    let metrics = yield_metrics(&dividends, 50.0, day(720));
    assert!(metrics.ttm.is_some());
}

// =============================================================================
// Ratios and Rounding
// =============================================================================

#[test]
fn test_non_finite_inputs_are_rejected() {
    let info = CompanyInfo {
        market_cap: Some(f64::NAN),
        ..CompanyInfo::default()
    };

    assert!(matches!(
        try_derive_ratios(&info, None, None, None),
        Err(MetricsError::NonFinite { .. })
    ));
    assert_eq!(derive_ratios(&info, None, None, None), RatioSet::default());
}

#[test]
fn test_zero_denominators_leave_ratios_absent() {
    let zero = |items: &[&str]| StatementPeriod {
        period_ending: None,
        items: items.iter().map(|name| ((*name).to_string(), Some(0.0))).collect(),
    };
    let income = zero(&["Total Revenue", "Net Income", "Operating Income"]);
    let balance = zero(&["Total Assets", "Total Stockholder Equity", "Long Term Debt"]);
    let cashflow = zero(&["Free Cash Flow"]);

    let ratios = derive_ratios(
        &CompanyInfo::default(),
        Some(&income),
        Some(&balance),
        Some(&cashflow),
    );
    assert_eq!(ratios.roic, None);
    assert_eq!(ratios.fcf_yield, None);
    assert_eq!(ratios.asset_turnover, None);
}

#[test]
fn test_round_to_half_away_from_zero() {
    assert_eq!(round_to(2.5, 0), 3.0);
    assert_eq!(round_to(-2.5, 0), -3.0);
    assert_eq!(round_to(1.234_56, 2), 1.23);
    assert_eq!(round_to(0.0, 4), 0.0);
}
