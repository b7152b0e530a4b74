//! Financial-metrics computation.
//!
//! Pure functions over market data: no I/O, no shared state. Every result
//! that depends on optional inputs is itself optional, and a missing operand
//! is never read as zero.
//!
//! - [`ratios`]: valuation, profitability and liquidity ratios
//! - [`total_return`]: dividend-reinvested total-return index
//! - [`dividends`]: dividend growth, consistency and yield

pub mod dividends;
pub mod ratios;
pub mod total_return;

pub use dividends::{
    consistency_score, dividend_cagr, growth_metrics, yield_metrics, DividendGrowthMetrics,
    DividendYieldMetrics,
};
pub use ratios::{derive_ratios, try_derive_ratios, RatioSet};
pub use total_return::{total_return_index, TotalReturnPoint, BASE_INDEX};

use thiserror::Error;

/// Errors raised by metric computations on malformed input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    /// An operand or result was NaN or infinite.
    #[error("non-finite value for {field}")]
    NonFinite {
        /// Name of the offending input or result.
        field: &'static str,
    },
}

/// Rounds half away from zero to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_places() {
        assert!((round_to(1.23456, 4) - 1.2346).abs() < 1e-12);
        assert!((round_to(2.345, 1) - 2.3).abs() < 1e-12);
        assert!((round_to(-0.125, 2) - -0.13).abs() < 1e-12);
        assert!((round_to(99.999, 2) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn error_display() {
        let err = MetricsError::NonFinite { field: "Net Income" };
        assert_eq!(err.to_string(), "non-finite value for Net Income");
    }
}
