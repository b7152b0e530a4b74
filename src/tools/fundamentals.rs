//! `get_fundamentals`.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::market::{
    CompanyInfo, MarketDataProvider, ProviderError, ReportingFrequency, StatementPeriod, Statements,
};
use crate::metrics::{derive_ratios, RatioSet};
use crate::tools::args;
use crate::tools::models::{
    iso_date, FundamentalsMetadata, StatementRecord, StockFundamentals, DEFAULT_CURRENCY,
};
use crate::tools::ToolError;

const DEFAULT_YEARS: i64 = 5;
const YEARS_RANGE: (i64, i64) = (1, 10);

/// Requested reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Annual,
    Quarterly,
    /// Trailing twelve months, served from the most recent annual statements.
    Ttm,
}

impl Period {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "annual" => Some(Self::Annual),
            "quarterly" => Some(Self::Quarterly),
            "ttm" => Some(Self::Ttm),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
            Self::Ttm => "ttm",
        }
    }

    const fn frequency(self) -> ReportingFrequency {
        match self {
            Self::Annual | Self::Ttm => ReportingFrequency::Annual,
            Self::Quarterly => ReportingFrequency::Quarterly,
        }
    }
}

/// Statements truncated to the requested number of periods, plus ratios
/// derived from the latest annual figures.
pub async fn get_fundamentals(
    provider: &dyn MarketDataProvider,
    arguments: &Map<String, Value>,
    today: NaiveDate,
) -> Result<StockFundamentals, ToolError> {
    let Some(symbol) = args::symbol(arguments, "instrument") else {
        return Err(ToolError::instrument(
            None,
            "Instrument (ticker symbol) is required",
        ));
    };

    let period = match arguments.get("period") {
        None | Some(Value::Null) => Some(Period::Annual),
        Some(value) => value.as_str().and_then(Period::parse),
    }
    .ok_or_else(|| {
        ToolError::instrument(Some(&symbol), "Period must be one of: annual, quarterly, ttm")
    })?;

    let years = args::bounded_integer(
        arguments,
        "years",
        YEARS_RANGE,
        DEFAULT_YEARS,
        "Years must be an integer between 1 and 10",
    )
    .map_err(|message| ToolError::instrument(Some(&symbol), message))?;

    let fetch_error = |e: ProviderError| {
        ToolError::instrument(
            Some(&symbol),
            format!("Error fetching fundamentals for '{symbol}': {e}"),
        )
    };

    let info = provider.company_info(&symbol).await.map_err(fetch_error)?;
    let mut statements = provider
        .statements(&symbol, period.frequency())
        .await
        .map_err(fetch_error)?;

    let ratios = if period.frequency() == ReportingFrequency::Annual {
        ratios_from(&info, &statements)
    } else {
        match provider.statements(&symbol, ReportingFrequency::Annual).await {
            Ok(annual) => ratios_from(&info, &annual),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Annual statements unavailable for ratios");
                RatioSet::default()
            }
        }
    };

    statements.truncate(usize::try_from(years).unwrap_or(usize::MAX));

    let currency = info
        .currency
        .clone()
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let records = |periods: &[StatementPeriod]| -> Vec<StatementRecord> {
        periods
            .iter()
            .map(|p| StatementRecord::from_period(p, &currency))
            .collect()
    };

    Ok(StockFundamentals {
        income: records(&statements.income),
        balance: records(&statements.balance),
        cashflow: records(&statements.cashflow),
        ratios,
        meta: FundamentalsMetadata {
            currency: Some(currency.clone()),
            as_of: Some(iso_date(today)),
            period_type: period.as_str().to_string(),
            years_requested: years,
        },
        symbol,
    })
}

fn ratios_from(info: &CompanyInfo, statements: &Statements) -> RatioSet {
    derive_ratios(
        info,
        statements.income.first(),
        statements.balance.first(),
        statements.cashflow.first(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::market::{InMemoryProvider, ProviderCall, SymbolData};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn period(year: i32, items: &[(&str, f64)]) -> StatementPeriod {
        StatementPeriod {
            period_ending: NaiveDate::from_ymd_opt(year, 12, 31),
            items: items
                .iter()
                .map(|(name, value)| ((*name).to_string(), Some(*value)))
                .collect(),
        }
    }

    fn statements(years: &[i32], revenue: f64) -> Statements {
        Statements {
            income: years
                .iter()
                .map(|y| period(*y, &[("Total Revenue", revenue), ("Net Income", 50.0)]))
                .collect(),
            balance: years
                .iter()
                .map(|y| {
                    period(
                        *y,
                        &[
                            ("Total Assets", 800.0),
                            ("Total Stockholder Equity", 150.0),
                            ("Long Term Debt", 100.0),
                        ],
                    )
                })
                .collect(),
            cashflow: Vec::new(),
        }
    }

    fn provider() -> InMemoryProvider {
        InMemoryProvider::new().with_symbol(
            "MSFT",
            SymbolData {
                info: CompanyInfo {
                    currency: Some("USD".to_string()),
                    trailing_pe: Some(35.0),
                    ..CompanyInfo::default()
                },
                annual: statements(&[2023, 2022, 2021, 2020, 2019, 2018], 400.0),
                quarterly: statements(&[2024, 2023], 100.0),
                ..SymbolData::default()
            },
        )
    }

    #[tokio::test]
    async fn annual_defaults() {
        let out = get_fundamentals(&provider(), &args(json!({"instrument": "msft"})), today())
            .await
            .unwrap();

        assert_eq!(out.symbol, "MSFT");
        assert_eq!(out.income.len(), 5);
        assert_eq!(out.income[0].period_ending.as_deref(), Some("2023-12-31"));
        assert_eq!(out.income[0].data["Total Revenue"], Some(400.0));
        assert_eq!(out.ratios.pe_ratio, Some(35.0));
        assert_eq!(out.ratios.asset_turnover, Some(0.5));
        assert_eq!(out.meta.period_type, "annual");
        assert_eq!(out.meta.years_requested, 5);
        assert_eq!(out.meta.as_of.as_deref(), Some("2024-06-30"));
        assert!(out.cashflow.is_empty());
    }

    #[tokio::test]
    async fn quarterly_ratios_come_from_annual_statements() {
        let a = args(json!({"instrument": "MSFT", "period": "Quarterly", "years": 1}));
        let out = get_fundamentals(&provider(), &a, today()).await.unwrap();

        assert_eq!(out.income.len(), 1);
        assert_eq!(out.income[0].data["Total Revenue"], Some(100.0));
        assert_eq!(out.ratios.asset_turnover, Some(0.5));
        assert_eq!(out.meta.period_type, "quarterly");
    }

    #[tokio::test]
    async fn quarterly_survives_missing_annual_statements() {
        let provider =
            provider().with_failure("MSFT", ProviderCall::AnnualStatements, "unavailable");
        let a = args(json!({"instrument": "MSFT", "period": "quarterly"}));
        let out = get_fundamentals(&provider, &a, today()).await.unwrap();

        assert_eq!(out.income.len(), 2);
        assert_eq!(out.ratios, RatioSet::default());
    }

    #[tokio::test]
    async fn ttm_uses_annual_statements() {
        let a = args(json!({"instrument": "MSFT", "period": "ttm", "years": 2}));
        let out = get_fundamentals(&provider(), &a, today()).await.unwrap();

        assert_eq!(out.income.len(), 2);
        assert_eq!(out.income[0].data["Total Revenue"], Some(400.0));
        assert_eq!(out.meta.period_type, "ttm");
    }

    #[tokio::test]
    async fn argument_validation() {
        let cases = [
            (json!({}), "Instrument (ticker symbol) is required"),
            (
                json!({"instrument": "MSFT", "period": "weekly"}),
                "Period must be one of: annual, quarterly, ttm",
            ),
            (
                json!({"instrument": "MSFT", "years": 11}),
                "Years must be an integer between 1 and 10",
            ),
            (
                json!({"instrument": "MSFT", "years": 0}),
                "Years must be an integer between 1 and 10",
            ),
        ];
        for (arguments, message) in cases {
            let err = get_fundamentals(&provider(), &args(arguments), today())
                .await
                .unwrap_err();
            assert_eq!(err.message(), message);
        }
    }

    #[tokio::test]
    async fn provider_failure() {
        let err = get_fundamentals(
            &InMemoryProvider::new(),
            &args(json!({"instrument": "NOPE"})),
            today(),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_payload(),
            json!({
                "error": "Error fetching fundamentals for 'NOPE': symbol not found: NOPE",
                "instrument": "NOPE"
            })
        );
    }
}
