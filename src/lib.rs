//! stockmcp: MCP server exposing stock-market data over JSON-RPC/HTTP
//!
//! This library answers Model Context Protocol requests posted to a single
//! HTTP endpoint. Four tools return quotes, fundamentals, price history and
//! dividends, each computed from a pluggable market-data provider.
//!
//! # Architecture
//!
//! - **Transport**: `POST /api/mcp` and `GET /health` served by axum
//! - **Router**: JSON-RPC parsing and method dispatch
//! - **Tools**: argument validation and response shaping
//! - **Metrics**: ratios, total-return index, dividend growth and yield
//! - **Market data**: the provider trait, a Yahoo Finance client and an
//!   in-memory provider for tests
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`market`]: Market-data provider seam
//! - [`metrics`]: Financial metrics
//! - [`mcp`]: MCP protocol implementation
//! - [`tools`]: Tool handlers

pub mod config;
pub mod market;
pub mod mcp;
pub mod metrics;
pub mod tools;
