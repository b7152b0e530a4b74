//! Dividend growth, consistency and yield metrics.
//!
//! Growth and consistency look at calendar-year totals, which evens out
//! differing payment frequencies.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::market::DividendSeries;
use crate::metrics::round_to;

/// Points deducted per year-over-year dividend cut.
const CUT_PENALTY: f64 = 15.0;

/// A year's total below this fraction of the previous year's is a cut.
const CUT_TOLERANCE: f64 = 0.95;

const TTM_WINDOW_DAYS: u64 = 365;
const FIVE_YEAR_WINDOW_DAYS: u64 = 365 * 5;
const DAYS_PER_YEAR: f64 = 365.25;
const MAX_CAGR_YEARS: f64 = 5.0;

/// Dividend growth metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DividendGrowthMetrics {
    /// Compound annual growth rate, percent, over at most five years.
    pub cagr_5y: Option<f64>,
    /// Regularity score in `[0, 100]`.
    pub consistency_score: Option<f64>,
}

/// Dividend yield metrics, percent of the current price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DividendYieldMetrics {
    /// Trailing twelve-month yield.
    pub ttm: Option<f64>,
    /// Average annual yield over the last five years.
    pub five_year_avg: Option<f64>,
}

/// Compound annual growth rate of the calendar-year dividend totals, in
/// percent rounded to 2 decimals.
///
/// `years` is the compounding period and is not derived from the data.
/// Absent with fewer than 2 payments or 2 years, a non-positive `years`, or a
/// non-positive first or last year total.
#[must_use]
pub fn dividend_cagr(dividends: &DividendSeries, years: f64) -> Option<f64> {
    if dividends.len() < 2 || years <= 0.0 {
        return None;
    }

    let totals = dividends.annual_totals();
    if totals.len() < 2 {
        return None;
    }
    let first = totals.values().next().copied()?;
    let last = totals.values().next_back().copied()?;
    if first <= 0.0 || last <= 0.0 {
        return None;
    }

    let cagr = (last / first).powf(1.0 / years) - 1.0;
    Some(round_to(cagr * 100.0, 2))
}

/// Scores how regularly dividends were paid, from 0 to 100 rounded to 1
/// decimal.
///
/// Starts from the share of calendar years with a positive total and loses 15
/// points for every year whose total is below 95% of the year before. Needs at
/// least 4 payments.
#[must_use]
pub fn consistency_score(dividends: &DividendSeries) -> Option<f64> {
    if dividends.len() < 4 {
        return None;
    }

    let totals: Vec<f64> = dividends.annual_totals().into_values().collect();
    if totals.is_empty() {
        return Some(0.0);
    }

    let paying_years = totals.iter().filter(|total| **total > 0.0).count();
    let base = count_f64(paying_years) / count_f64(totals.len()) * 100.0;

    let cuts = totals
        .windows(2)
        .filter(|pair| pair[1] < pair[0] * CUT_TOLERANCE)
        .count();

    let score = (base - count_f64(cuts) * CUT_PENALTY).max(0.0);
    Some(round_to(score, 1))
}

/// Growth metrics over the whole series.
///
/// Computed only with at least 2 payments spanning at least a year; the CAGR
/// compounds over the span, capped at five years.
#[must_use]
pub fn growth_metrics(dividends: &DividendSeries) -> DividendGrowthMetrics {
    let (Some(first), Some(last)) = (dividends.first_date(), dividends.last_date()) else {
        return DividendGrowthMetrics::default();
    };
    if dividends.len() < 2 {
        return DividendGrowthMetrics::default();
    }

    #[allow(clippy::cast_precision_loss)] // day counts are far below 2^52
    let years = (last - first).num_days() as f64 / DAYS_PER_YEAR;
    if years < 1.0 {
        return DividendGrowthMetrics::default();
    }

    DividendGrowthMetrics {
        cagr_5y: dividend_cagr(dividends, years.min(MAX_CAGR_YEARS)),
        consistency_score: consistency_score(dividends),
    }
}

/// Yield metrics relative to `price`, as of `as_of`.
///
/// The trailing yield sums payments from the last 365 days. The five-year
/// average sums payments from the last 1825 days and divides by five, and
/// needs at least 5 payments in the series. Both are absent for a
/// non-positive price or an empty series.
#[must_use]
pub fn yield_metrics(dividends: &DividendSeries, price: f64, as_of: NaiveDate) -> DividendYieldMetrics {
    let mut metrics = DividendYieldMetrics::default();
    if price <= 0.0 || dividends.is_empty() {
        return metrics;
    }

    let ttm: f64 = trailing(dividends, as_of, TTM_WINDOW_DAYS)
        .iter()
        .map(|(_, amount)| amount)
        .sum();
    if ttm > 0.0 {
        metrics.ttm = Some(round_to(ttm / price * 100.0, 2));
    }

    if dividends.len() >= 5 {
        let recent = trailing(dividends, as_of, FIVE_YEAR_WINDOW_DAYS);
        if !recent.is_empty() {
            let annual_average = recent.iter().map(|(_, amount)| amount).sum::<f64>() / 5.0;
            metrics.five_year_avg = Some(round_to(annual_average / price * 100.0, 2));
        }
    }

    metrics
}

/// Payments dated on or after `as_of - days`.
fn trailing(dividends: &DividendSeries, as_of: NaiveDate, days: u64) -> DividendSeries {
    let start = as_of
        .checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN);
    dividends.within(start, NaiveDate::MAX)
}

#[allow(clippy::cast_precision_loss)] // counts of years and payments
const fn count_f64(n: usize) -> f64 {
    n as f64
}
