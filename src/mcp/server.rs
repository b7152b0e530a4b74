//! MCP request router.
//!
//! Every request is answered independently: there is no session and no
//! initialisation handshake gating the other methods.

use serde_json::{json, Value};

use crate::mcp::protocol::{
    parse_request, InitializeResult, JsonRpcError, JsonRpcReply, JsonRpcRequest, JsonRpcResponse,
    ToolCallParams,
};
use crate::tools::ToolRegistry;

/// The MCP server for stock-market data.
pub struct McpServer {
    tools: ToolRegistry,
}

impl McpServer {
    /// Creates a server dispatching tool calls to `tools`.
    #[must_use]
    pub const fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    /// Handles a raw request body.
    pub async fn handle_body(&self, body: &[u8]) -> JsonRpcReply {
        match parse_request(body) {
            Ok(req) => self.handle_request(&req).await,
            Err(error) => {
                tracing::warn!(id = %error.id, message = %error.error.message, "Rejected request");
                error.into()
            }
        }
    }

    /// Handles a parsed request.
    pub async fn handle_request(&self, req: &JsonRpcRequest) -> JsonRpcReply {
        tracing::debug!(id = %req.id, method = %req.method, "Handling request");

        let response = match req.method.as_str() {
            "initialize" => Ok(Self::handle_initialize(req)),
            "tools/list" => Ok(Self::handle_tools_list(req)),
            "tools/call" => self.handle_tools_call(req).await,
            "ping" => Ok(Self::handle_ping(req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(resp) => resp.into(),
            Err(error) => {
                tracing::warn!(id = %req.id, message = %error.error.message, "Request failed");
                error.into()
            }
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!(InitializeResult::default()))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(req: &JsonRpcRequest) -> JsonRpcResponse {
        let result = json!({
            "tools": ToolRegistry::definitions(),
        });

        JsonRpcResponse::success(req.id.clone(), result)
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params = match &req.params {
            Some(params) if !params.is_empty() => params,
            _ => {
                return Err(JsonRpcError::invalid_params(
                    req.id.clone(),
                    "params are required for tool calls",
                ))
            }
        };

        let params: ToolCallParams = serde_json::from_value(Value::Object(params.clone()))
            .map_err(|e| JsonRpcError::internal_error(req.id.clone(), e))?;

        let result = self.tools.call(&params.name, &params.arguments).await;

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(req.id.clone(), "failed to serialise result")
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }
}
