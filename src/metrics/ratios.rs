//! Financial ratio derivation.

use serde::Serialize;

use crate::market::{CompanyInfo, StatementPeriod};
use crate::metrics::MetricsError;

/// Derived financial ratios. Each is absent when its inputs are.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatioSet {
    /// Trailing price to earnings.
    pub pe_ratio: Option<f64>,
    /// Price to book.
    pub pb_ratio: Option<f64>,
    /// Price to trailing twelve-month sales.
    pub ps_ratio: Option<f64>,
    /// Enterprise value to EBITDA.
    pub ev_ebitda: Option<f64>,
    /// Return on equity.
    pub roe: Option<f64>,
    /// Return on invested capital, percent.
    pub roic: Option<f64>,
    /// Free-cash-flow yield, percent.
    pub fcf_yield: Option<f64>,
    /// Debt to equity.
    pub debt_to_equity: Option<f64>,
    /// Current ratio.
    pub current_ratio: Option<f64>,
    /// Quick ratio.
    pub quick_ratio: Option<f64>,
    /// Gross margin.
    pub gross_margin: Option<f64>,
    /// Operating margin.
    pub operating_margin: Option<f64>,
    /// Net margin.
    pub net_margin: Option<f64>,
    /// Revenue to total assets.
    pub asset_turnover: Option<f64>,
    /// Dividend payout ratio.
    pub dividend_payout_ratio: Option<f64>,
}

/// Derives ratios from the company snapshot and the most recent period of
/// each statement.
///
/// Malformed input yields an all-absent set; the failure is logged.
#[must_use]
pub fn derive_ratios(
    info: &CompanyInfo,
    income: Option<&StatementPeriod>,
    balance: Option<&StatementPeriod>,
    cashflow: Option<&StatementPeriod>,
) -> RatioSet {
    try_derive_ratios(info, income, balance, cashflow).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Error calculating ratios");
        RatioSet::default()
    })
}

/// Derives ratios, failing on non-finite operands or results.
///
/// # Errors
///
/// Returns [`MetricsError::NonFinite`] if any value taking part in a ratio is
/// NaN or infinite.
pub fn try_derive_ratios(
    info: &CompanyInfo,
    income: Option<&StatementPeriod>,
    balance: Option<&StatementPeriod>,
    cashflow: Option<&StatementPeriod>,
) -> Result<RatioSet, MetricsError> {
    let item = |period: Option<&StatementPeriod>, name: &'static str| {
        period.and_then(|p| p.value(name)).map(|v| finite(v, name)).transpose()
    };

    let net_income = item(income, "Net Income")?;
    let revenue = item(income, "Total Revenue")?;
    let equity = item(balance, "Total Stockholder Equity")?;
    let long_term_debt = item(balance, "Long Term Debt")?;
    let total_assets = item(balance, "Total Assets")?;
    let free_cash_flow = item(cashflow, "Free Cash Flow")?;
    let market_cap = info.market_cap.map(|v| finite(v, "market cap")).transpose()?;

    let roic = match (net_income, equity, long_term_debt) {
        (Some(net_income), Some(equity), Some(debt)) if equity + debt != 0.0 => {
            Some(finite(net_income / (equity + debt) * 100.0, "roic")?)
        }
        _ => None,
    };

    let fcf_yield = match (free_cash_flow, market_cap) {
        (Some(fcf), Some(cap)) if fcf != 0.0 && cap != 0.0 => {
            Some(finite(fcf / cap * 100.0, "fcf_yield")?)
        }
        _ => None,
    };

    let asset_turnover = match (revenue, total_assets) {
        (Some(revenue), Some(assets)) if assets != 0.0 => {
            Some(finite(revenue / assets, "asset_turnover")?)
        }
        _ => None,
    };

    Ok(RatioSet {
        pe_ratio: info.trailing_pe,
        pb_ratio: info.price_to_book,
        ps_ratio: info.price_to_sales_ttm,
        ev_ebitda: info.enterprise_to_ebitda,
        roe: info.return_on_equity,
        roic,
        fcf_yield,
        debt_to_equity: info.debt_to_equity,
        current_ratio: info.current_ratio,
        quick_ratio: info.quick_ratio,
        gross_margin: info.gross_margins,
        operating_margin: info.operating_margins,
        net_margin: info.profit_margins,
        asset_turnover,
        dividend_payout_ratio: info.payout_ratio,
    })
}

fn finite(value: f64, field: &'static str) -> Result<f64, MetricsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MetricsError::NonFinite { field })
    }
}
