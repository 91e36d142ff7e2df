//! MCP server dispatch core.
//!
//! The server owns the stdio transport, the injected tool registry and one
//! piece of session state: an `initialized` flag flipped by the `initialize`
//! method. Requests are handled strictly one at a time in arrival order; a
//! handler that blocks (device I/O, playback) blocks the whole loop, which
//! is acceptable for single-user local tooling.
//!
//! # Error tiers
//!
//! - Protocol errors (malformed request, unknown method, bad `tools/call`
//!   params, unknown tool name) are JSON-RPC error objects.
//! - Tool errors never become protocol errors: the dispatch boundary maps
//!   them into `isError: true` envelopes inside a successful response, so
//!   the calling LLM can read the failure text. One bad request never takes
//!   the process down.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ToolCallResult, MCP_PROTOCOL_VERSION,
};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::transport::StdioTransport;

/// Server metadata reported in the `initialize` response.
///
/// Populated from configuration and the `--name`/`--version`/`--description`
/// CLI flags.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Human-readable server description.
    pub description: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: env!("CARGO_PKG_DESCRIPTION").to_string(),
        }
    }
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// The MCP server: transport, registry and session state.
pub struct McpServer {
    info: ServerInfo,
    registry: ToolRegistry,
    transport: StdioTransport,
    initialized: bool,
}

impl McpServer {
    /// Creates a new MCP server around an already-built tool registry.
    #[must_use]
    pub fn new(info: ServerInfo, registry: ToolRegistry) -> Self {
        Self {
            info,
            registry,
            transport: StdioTransport::new(),
            initialized: false,
        }
    }

    /// Returns whether the `initialize` exchange has happened.
    #[must_use]
    pub const fn initialized(&self) -> bool {
        self.initialized
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, shutting down");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down (stdin closed).
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!("stdin closed, shutting down");
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(&line).await?;
        Ok(false)
    }

    /// Parses and handles a single line of input, writing the response (if
    /// any) as one complete unit before returning.
    async fn handle_line(&mut self, line: &str) -> std::io::Result<()> {
        let outcome = match parse_message(line) {
            Ok(msg) => self.handle(msg),
            Err(error) => Some(Err(error)),
        };

        match outcome {
            Some(Ok(response)) => self.transport.write_message(&response).await,
            Some(Err(error)) => self.transport.write_message(&error).await,
            None => Ok(()),
        }
    }

    /// Handles one decoded message.
    ///
    /// Requests produce exactly one response (success or protocol error)
    /// with a matching id; notifications produce `None`.
    pub fn handle(
        &mut self,
        msg: IncomingMessage,
    ) -> Option<Result<JsonRpcResponse, JsonRpcError>> {
        tracing::trace!(method = msg.method(), "dispatching message");
        match msg {
            IncomingMessage::Request(req) => Some(self.dispatch_request(&req)),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif);
                None
            }
        }
    }

    /// Routes a request by method name.
    fn dispatch_request(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        match req.method.as_str() {
            "initialize" => Ok(self.handle_initialize(req)),
            // A client that sends this as a request (with an id) still gets
            // an answer; the usual id-less form is handled as a notification.
            "notifications/initialized" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            "tools/list" => Ok(self.handle_tools_list(req)),
            "tools/call" => self.handle_tools_call(req),
            "resources/list" => Ok(JsonRpcResponse::success(
                req.id.clone(),
                json!({"resources": []}),
            )),
            "resources/templates/list" => Ok(JsonRpcResponse::success(
                req.id.clone(),
                json!({"resourceTemplates": []}),
            )),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    /// Handles an incoming notification. Produces no response.
    fn handle_notification(&self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => {
                tracing::debug!("client reported initialized");
            }
            other => {
                tracing::debug!(method = other, "ignoring notification");
            }
        }
    }

    /// Handles the initialize request. Always succeeds.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> JsonRpcResponse {
        if let Some(client) = req
            .params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
        {
            tracing::info!(client, "initialize received");
        }

        self.initialized = true;

        let result = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {},
            },
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version,
                "description": self.info.description,
            },
        });

        JsonRpcResponse::success(req.id.clone(), result)
    }

    /// Handles the tools/list request: the registry projected to
    /// definitions, in registration order.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let result = json!({
            "tools": self.registry.definitions(),
        });
        JsonRpcResponse::success(req.id.clone(), result)
    }

    /// Handles the tools/call request.
    ///
    /// Unknown tool names are protocol errors (a different tier from a tool
    /// that ran and failed); handler errors are mapped into `isError: true`
    /// envelopes at this boundary.
    fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(req.id.clone(), format!("Invalid tool call params: {e}"))
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        let Some(tool) = self.registry.get(&params.name) else {
            return Err(JsonRpcError::invalid_params(
                req.id.clone(),
                format!("Tool not found: {}", params.name),
            ));
        };

        let envelope = match tool.invoke(&params.arguments) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(tool = %params.name, error = %e, "tool call failed");
                ToolCallResult::error(e.to_string())
            }
        };

        let result_value = serde_json::to_value(&envelope).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }
}
