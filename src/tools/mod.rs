//! Stock-market data tools.
//!
//! Four tools are exposed, each answering with a JSON document rendered as
//! text:
//!
//! | Tool                        | Returns                                        |
//! |-----------------------------|------------------------------------------------|
//! | `get_realtime_quote`        | latest price, change, volume, headline ratios  |
//! | `get_fundamentals`          | statements, derived ratios                     |
//! | `get_price_history`         | OHLCV bars, total-return index, adjustments    |
//! | `get_dividends_and_actions` | dividends, yield and growth metrics, splits    |
//!
//! A tool that fails answers with `{"error": ..., <subject>: ...}` where the
//! subject key is `symbol` for the quote tool and `instrument` otherwise.

mod args;
mod dividends;
mod fundamentals;
pub mod models;
mod price_history;
mod quote;

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::market::MarketDataProvider;
use crate::mcp::protocol::{ToolCallResult, ToolDefinition};

/// Name of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    /// `get_realtime_quote`
    RealtimeQuote,
    /// `get_fundamentals`
    Fundamentals,
    /// `get_price_history`
    PriceHistory,
    /// `get_dividends_and_actions`
    DividendsAndActions,
}

impl ToolName {
    /// All tools, in listing order.
    pub const ALL: [Self; 4] = [
        Self::RealtimeQuote,
        Self::Fundamentals,
        Self::PriceHistory,
        Self::DividendsAndActions,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RealtimeQuote => "get_realtime_quote",
            Self::Fundamentals => "get_fundamentals",
            Self::PriceHistory => "get_price_history",
            Self::DividendsAndActions => "get_dividends_and_actions",
        }
    }

    /// Looks a tool up by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool-level failure, reported to the caller inside a successful result.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolError {
    message: String,
    subject_key: &'static str,
    subject: Option<String>,
}

impl ToolError {
    /// Creates an error about `subject`, reported under `subject_key`.
    pub fn new(subject_key: &'static str, subject: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            subject_key,
            subject: subject.map(str::to_string),
        }
    }

    /// Creates an error about an instrument.
    pub fn instrument(subject: Option<&str>, message: impl Into<String>) -> Self {
        Self::new("instrument", subject, message)
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The `{"error": ..., <subject>: ...}` payload.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("error".to_string(), Value::String(self.message.clone()));
        payload.insert(
            self.subject_key.to_string(),
            self.subject.clone().map_or(Value::Null, Value::String),
        );
        Value::Object(payload)
    }
}

#[derive(Serialize)]
struct UnknownTool<'a> {
    error: String,
    available_tools: Vec<&'a str>,
}

/// Dispatches tool calls to their handlers.
pub struct ToolRegistry {
    provider: Arc<dyn MarketDataProvider>,
    today: Option<NaiveDate>,
}

impl ToolRegistry {
    /// Creates a registry backed by `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            today: None,
        }
    }

    /// Pins the date used for defaults and "as of" values.
    #[must_use]
    pub const fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Executes a tool.
    ///
    /// Unknown tools are not an error at this level: the result text names
    /// the available tools.
    pub async fn call(&self, name: &str, arguments: &Map<String, Value>) -> ToolCallResult {
        let Some(tool) = ToolName::from_name(name) else {
            tracing::warn!(tool = name, "Unknown tool requested");
            let payload = UnknownTool {
                error: format!("Tool '{name}' not found"),
                available_tools: ToolName::ALL.iter().map(|t| t.as_str()).collect(),
            };
            return match serde_json::to_string_pretty(&payload) {
                Ok(text) => ToolCallResult::text(text),
                Err(e) => serialisation_failure(&e),
            };
        };

        tracing::info!(%tool, "Calling tool");
        let provider = self.provider.as_ref();
        match tool {
            ToolName::RealtimeQuote => render(tool, quote::get_realtime_quote(provider, arguments).await),
            ToolName::Fundamentals => render(
                tool,
                fundamentals::get_fundamentals(provider, arguments, self.today()).await,
            ),
            ToolName::PriceHistory => render(
                tool,
                price_history::get_price_history(provider, arguments).await,
            ),
            ToolName::DividendsAndActions => render(
                tool,
                dividends::get_dividends_and_actions(provider, arguments, self.today()).await,
            ),
        }
    }

    /// Tool descriptors for `tools/list`.
    #[must_use]
    pub fn definitions() -> Vec<ToolDefinition> {
        ToolName::ALL.into_iter().map(definition).collect()
    }
}

fn render<T: Serialize>(tool: ToolName, result: Result<T, ToolError>) -> ToolCallResult {
    match result {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => serialisation_failure(&e),
        },
        Err(error) => {
            tracing::warn!(%tool, error = %error, "Tool reported an error");
            ToolCallResult::error(format!("{:#}", error.to_payload()))
        }
    }
}

fn serialisation_failure(error: &serde_json::Error) -> ToolCallResult {
    tracing::error!(error = %error, "Failed to serialise tool output");
    ToolCallResult::error(
        json!({ "error": format!("Failed to serialise tool output: {error}") }).to_string(),
    )
}

const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";

fn definition(tool: ToolName) -> ToolDefinition {
    let (title, description, input_schema) = match tool {
        ToolName::RealtimeQuote => (
            "Real-time Stock Quote",
            "Retrieve current market data for a stock including price, volume, market cap, \
             and key financial ratios. Provides up-to-date trading information essential for \
             market analysis and investment decisions.",
            json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "Stock ticker symbol (e.g., 'AAPL' for Apple, 'GOOGL' for Google, 'TSLA' for Tesla)"
                    }
                },
                "required": ["symbol"]
            }),
        ),
        ToolName::Fundamentals => (
            "Financial Statements and Ratios",
            "Access comprehensive financial data including income statements, balance sheets, \
             cash flow statements, and calculated financial ratios. Essential for fundamental \
             analysis, valuation, and long-term investment research.",
            json!({
                "type": "object",
                "properties": {
                    "instrument": {
                        "type": "string",
                        "description": "Stock ticker symbol (e.g., 'AAPL' for Apple, 'MSFT' for Microsoft)"
                    },
                    "period": {
                        "type": "string",
                        "description": "Reporting period for financial statements",
                        "enum": ["annual", "quarterly", "ttm"]
                    },
                    "years": {
                        "type": "integer",
                        "description": "Number of years/periods of historical data to retrieve (default: 5)",
                        "minimum": 1,
                        "maximum": 10,
                        "default": 5
                    }
                },
                "required": ["instrument", "period"]
            }),
        ),
        ToolName::PriceHistory => (
            "Historical Price Data",
            "Retrieve historical OHLCV (Open, High, Low, Close, Volume) data with optional \
             total return calculation including reinvested dividends. Ideal for backtesting, \
             technical analysis, and performance measurement.",
            json!({
                "type": "object",
                "properties": {
                    "instrument": {
                        "type": "string",
                        "description": "Stock ticker symbol (e.g., 'AAPL' for Apple, 'SPY' for SPDR S&P 500 ETF)"
                    },
                    "start": {
                        "type": "string",
                        "description": "Start date for historical data in YYYY-MM-DD format (e.g., '2023-01-01')",
                        "pattern": DATE_PATTERN
                    },
                    "end": {
                        "type": "string",
                        "description": "End date for historical data in YYYY-MM-DD format (e.g., '2024-12-31'), inclusive",
                        "pattern": DATE_PATTERN
                    },
                    "interval": {
                        "type": "string",
                        "description": "Data frequency: daily (1d), weekly (1w), or monthly (1m). Note: 1m requests are limited to a 30-day span",
                        "enum": ["1d", "1w", "1m"],
                        "default": "1d"
                    },
                    "adjusted": {
                        "type": "boolean",
                        "description": "Return split and dividend adjusted prices for accurate historical analysis",
                        "default": true
                    },
                    "include_total_return": {
                        "type": "boolean",
                        "description": "Calculate total return index assuming dividend reinvestment for performance analysis",
                        "default": true
                    }
                },
                "required": ["instrument", "start", "end"]
            }),
        ),
        ToolName::DividendsAndActions => (
            "Dividend History and Corporate Actions",
            "Analyze dividend payment history and corporate actions with quality metrics. \
             Includes dividend yield calculations, growth rates, consistency scoring, and stock \
             split information for income-focused investment analysis.",
            json!({
                "type": "object",
                "properties": {
                    "instrument": {
                        "type": "string",
                        "description": "Stock ticker symbol (e.g., 'KO' for Coca-Cola, 'JNJ' for Johnson & Johnson)"
                    },
                    "start": {
                        "type": "string",
                        "description": "Start date for dividend history in YYYY-MM-DD format. If not specified, defaults to 10 years ago",
                        "pattern": DATE_PATTERN
                    },
                    "end": {
                        "type": "string",
                        "description": "End date for dividend history in YYYY-MM-DD format. If not specified, defaults to current date",
                        "pattern": DATE_PATTERN
                    }
                },
                "required": ["instrument"]
            }),
        ),
    };

    ToolDefinition {
        name: tool.as_str().to_string(),
        title: title.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::InMemoryProvider;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(InMemoryProvider::new()))
    }

    fn text(result: &ToolCallResult) -> Value {
        let crate::mcp::protocol::ToolContent::Text { text } = &result.content[0];
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn tool_names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::from_name(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::from_name("get_weather"), None);
    }

    #[test]
    fn definitions_cover_every_tool() {
        let definitions = ToolRegistry::definitions();
        let names: Vec<_> = definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "get_realtime_quote",
                "get_fundamentals",
                "get_price_history",
                "get_dividends_and_actions"
            ]
        );
        for definition in &definitions {
            assert_eq!(definition.input_schema["type"], "object");
            assert!(definition.input_schema["required"].is_array());
            assert!(!definition.title.is_empty());
        }
    }

    #[test]
    fn error_payload_uses_subject_key() {
        let error = ToolError::new("symbol", None, "Symbol is required");
        assert_eq!(
            error.to_payload(),
            json!({"error": "Symbol is required", "symbol": null})
        );

        let error = ToolError::instrument(Some("KO"), "boom");
        assert_eq!(error.to_payload(), json!({"error": "boom", "instrument": "KO"}));
        assert_eq!(error.to_string(), "boom");
    }

    #[tokio::test]
    async fn unknown_tool_lists_available_tools() {
        let result = registry().call("get_weather", &Map::new()).await;

        assert!(!result.is_error);
        let payload = text(&result);
        assert_eq!(payload["error"], "Tool 'get_weather' not found");
        assert_eq!(payload["available_tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn tool_errors_are_flagged() {
        let result = registry().call("get_realtime_quote", &Map::new()).await;

        assert!(result.is_error);
        assert_eq!(text(&result)["error"], "Symbol is required");
    }
}
