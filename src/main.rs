//! stockmcp: MCP server exposing stock-market data over JSON-RPC/HTTP
//!
//! This binary serves quotes, fundamentals, price history and dividend
//! metrics to AI assistants, backed by Yahoo Finance.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use stockmcp::config;
use stockmcp::market::YahooProvider;
use stockmcp::mcp::{HttpTransport, McpServer};
use stockmcp::tools::ToolRegistry;

/// MCP server for stock-market data.
///
/// Serves JSON-RPC requests on `POST /api/mcp` and a health probe on
/// `GET /health`.
#[derive(Parser, Debug)]
#[command(name = "stockmcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Interface to bind to, overriding the configuration file
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overriding the configuration file
    #[arg(short, long)]
    port: Option<u16>,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "info" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the stockmcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig read from: {}", default_path.display());
                    eprintln!("See config/example-config.json for the format");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting stockmcp server"
    );

    let provider = match YahooProvider::new(&cfg.provider) {
        Ok(provider) => provider,
        Err(e) => {
            error!(error = %e, "Failed to create market-data client");
            return ExitCode::FAILURE;
        }
    };

    info!(base_url = %cfg.provider.base_url, "Market-data provider configured");

    let server = Arc::new(McpServer::new(ToolRegistry::new(Arc::new(provider))));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let transport = HttpTransport::bind(&cfg.server.host, cfg.server.port).await?;
        transport.serve(server).await
    });

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, host = %cfg.server.host, port = cfg.server.port, "Server error");
            ExitCode::FAILURE
        }
    }
}
