//! End-to-end tests of the HTTP endpoints with an in-memory provider.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use stockmcp::market::{
    CompanyInfo, InMemoryProvider, PriceBar, StatementPeriod, Statements, SymbolData,
};
use stockmcp::mcp::{router, McpServer};
use stockmcp::tools::ToolRegistry;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn period(year: i32, items: &[(&str, f64)]) -> StatementPeriod {
    StatementPeriod {
        period_ending: Some(date(year, 12, 31)),
        items: items
            .iter()
            .map(|(name, value)| ((*name).to_string(), Some(*value)))
            .collect(),
    }
}

fn coca_cola() -> SymbolData {
    let closes = [60.0, 61.0, 60.5, 62.0, 62.5];
    SymbolData {
        info: CompanyInfo {
            currency: Some("USD".to_string()),
            market_cap: Some(260.0e9),
            regular_market_price: Some(62.5),
            trailing_pe: Some(24.0),
            ..CompanyInfo::default()
        },
        bars: closes
            .iter()
            .zip(3..)
            .map(|(close, day)| PriceBar {
                volume: Some(1_000_000),
                ..PriceBar::close_only(date(2024, 6, day), Some(*close))
            })
            .collect(),
        timezone: Some("America/New_York".to_string()),
        annual: Statements {
            income: vec![period(
                2023,
                &[("Total Revenue", 45.0e9), ("Net Income", 10.0e9)],
            )],
            balance: vec![period(
                2023,
                &[("Total Assets", 97.0e9), ("Total Stockholder Equity", 26.0e9)],
            )],
            cashflow: vec![period(2023, &[("Free Cash Flow", 9.7e9)])],
        },
        dividends: (2020..=2024)
            .flat_map(|year| [3, 6, 9, 12].map(|month| (date(year, month, 14), 0.46)))
            .filter(|(d, _)| *d <= date(2024, 6, 14))
            .collect(),
        splits: [(date(2021, 8, 13), 2.0)].into_iter().collect(),
        ..SymbolData::default()
    }
}

fn app() -> Router {
    let provider = InMemoryProvider::new().with_symbol("KO", coca_cola());
    let tools = ToolRegistry::new(Arc::new(provider)).with_today(date(2024, 6, 30));
    router(Arc::new(McpServer::new(tools)))
}

async fn post(body: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(
            Request::post("/api/mcp")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn call_tool(name: &str, arguments: Value) -> (Value, bool) {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    });
    let (status, reply) = post(&body.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let result = &reply["result"];
    let text = result["content"][0]["text"].as_str().unwrap();
    (
        serde_json::from_str(text).unwrap(),
        result["isError"].as_bool().unwrap_or(false),
    )
}

#[tokio::test]
async fn health_endpoint() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "healthy", "service": "stockmcp"}));
}

#[tokio::test]
async fn parse_errors_are_status_200() {
    let (status, reply) = post(r#"{"id": "x-1", "method": 7}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["id"], "x-1");
    assert_eq!(reply["error"]["code"], -32700);
}

#[tokio::test]
async fn tools_list_over_http() {
    let (_, reply) = post(r#"{"jsonrpc": "2.0", "id": 2, "method": "tools/list"}"#).await;

    let tools = reply["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 4);
    for tool in tools {
        assert!(tool["title"].is_string());
        assert!(tool["description"].is_string());
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[tokio::test]
async fn realtime_quote() {
    let (quote, is_error) = call_tool("get_realtime_quote", json!({"symbol": "ko"})).await;

    assert!(!is_error);
    assert_eq!(quote["symbol"], "KO");
    assert_eq!(quote["price"], 62.5);
    assert_eq!(quote["change"], 0.5);
    assert_eq!(quote["volume"], 1_000_000);
    assert_eq!(quote["pe_ratio"], 24.0);
    assert!(quote["dividend_yield"].is_null());
}

#[tokio::test]
async fn fundamentals() {
    let (out, is_error) = call_tool("get_fundamentals", json!({"instrument": "KO"})).await;

    assert!(!is_error);
    assert_eq!(out["income"][0]["period_ending"], "2023-12-31");
    assert_eq!(out["income"][0]["currency"], "USD");
    assert_eq!(out["ratios"]["pe_ratio"], 24.0);
    assert_eq!(out["meta"]["as_of"], "2024-06-30");
    assert_eq!(out["meta"]["period_type"], "annual");
}

#[tokio::test]
async fn price_history_with_total_return() {
    let (out, is_error) = call_tool(
        "get_price_history",
        json!({"instrument": "KO", "start": "2024-06-01", "end": "2024-06-30"}),
    )
    .await;

    assert!(!is_error);
    assert_eq!(out["bars"].as_array().unwrap().len(), 5);
    assert_eq!(
        out["bars"][0],
        json!({"t": "2024-06-03", "o": null, "h": null, "l": null, "c": 60.0, "v": 1_000_000})
    );
    assert_eq!(out["total_return"][0]["tr"], 100.0);
    assert_eq!(out["adjustments"]["dividends"], json!({"2024-06-14": 0.46}));
    assert_eq!(out["tz"], "America/New_York");
}

#[tokio::test]
async fn price_history_rejects_long_monthly_span() {
    let (out, is_error) = call_tool(
        "get_price_history",
        json!({"instrument": "KO", "start": "2024-01-01", "end": "2024-06-30", "interval": "1m"}),
    )
    .await;

    assert!(is_error);
    assert_eq!(out["instrument"], "KO");
    assert!(out["error"].as_str().unwrap().contains("181 days"));
}

#[tokio::test]
async fn dividends_and_actions() {
    let (out, is_error) = call_tool("get_dividends_and_actions", json!({"instrument": "KO"})).await;

    assert!(!is_error);
    assert_eq!(out["period_end"], "2024-06-30");
    assert_eq!(out["dividends"].as_array().unwrap().len(), 18);
    assert_eq!(out["dividends"][0]["ex_date"], "2020-03-14");
    // The half-year 2024 total reads as a cut.
    assert_eq!(out["growth_metrics"]["consistency_score"], 85.0);
    assert_eq!(out["actions"][0]["type"], "split");
    assert_eq!(out["actions"][0]["description"], "Stock split 2.0:1");
    assert!(out["yield_metrics"]["ttm"].as_f64().unwrap() > 2.9);
}
