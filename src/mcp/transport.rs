//! HTTP transport for the MCP server.
//!
//! - `POST /api/mcp`: one JSON-RPC request per body. The reply is always sent
//!   with status 200, protocol errors included. The body is read as JSON
//!   whatever its declared content type.
//! - `GET /health`: liveness probe.
//!
//! CORS is fully permissive and every request is traced.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::mcp::protocol::JsonRpcReply;
use crate::mcp::server::McpServer;

/// Path of the JSON-RPC endpoint.
pub const MCP_PATH: &str = "/api/mcp";

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Body of the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy",
            service: "stockmcp",
        }
    }
}

/// Builds the HTTP router.
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route(MCP_PATH, post(mcp_endpoint))
        .route(HEALTH_PATH, get(health_check))
        .with_state(server)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn mcp_endpoint(State(server): State<Arc<McpServer>>, body: Bytes) -> Json<JsonRpcReply> {
    Json(server.handle_body(&body).await)
}

async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus::default())
}

/// An HTTP listener serving the MCP router.
pub struct HttpTransport {
    listener: TcpListener,
}

impl HttpTransport {
    /// Binds to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(host: &str, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        Ok(Self { listener })
    }

    /// The bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until SIGINT or SIGTERM (Ctrl+C on Windows).
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handlers cannot be installed or the
    /// server fails.
    pub async fn serve(self, server: Arc<McpServer>) -> io::Result<()> {
        let shutdown = shutdown_signal()?;
        self.serve_with_shutdown(server, shutdown).await
    }

    /// Serves requests until `shutdown` completes, then drains in-flight
    /// requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails.
    pub async fn serve_with_shutdown(
        self,
        server: Arc<McpServer>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> io::Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "Listening on http://{addr}{MCP_PATH}");
        }

        axum::serve(self.listener, router(server))
            .with_graceful_shutdown(shutdown)
            .await
    }
}

#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
    })
}

#[cfg(windows)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    })
}
