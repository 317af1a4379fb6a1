//! MCP Server Core
//!
//! Routes decoded messages through the session gate to the handshake
//! handlers or the tool registry.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::protocol::codec;
use crate::protocol::messages::{CallToolRequest, Implementation, ListToolsResult};
use crate::protocol::types::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message,
};
use crate::registry::{DispatchError, ToolRegistry};
use crate::session::{Session, SessionState};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "sapphire-duck";

/// MCP server for one connection
pub struct McpServer {
    session: Session,
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        let info = Implementation {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        Self {
            session: Session::new(info),
            registry,
        }
    }

    /// Attach usage instructions to the initialize result
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.session = self.session.with_instructions(instructions);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Move the session to `Closed`. Later messages are dropped.
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Decode one framed line and handle it. Codec failures with a
    /// recoverable id are answered with an InvalidRequest error.
    pub async fn handle_frame(&mut self, line: &str) -> Option<JsonRpcResponse> {
        match codec::decode(line) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                warn!("Dropping malformed message: {}", e);
                e.to_response()
            }
        }
    }

    /// Handle a decoded message. Only requests produce a response.
    pub async fn handle_message(&mut self, message: Message) -> Option<JsonRpcResponse> {
        if self.session.is_closed() {
            warn!("Session closed, dropping {:?}", message.method());
            return None;
        }

        match message {
            Message::Request(request) => Some(self.handle_request(request).await),
            Message::Notification(notification) => {
                self.handle_notification(notification);
                None
            }
            Message::Response(response) => {
                warn!("Ignoring unexpected response with id {:?}", response.id);
                None
            }
        }
    }

    /// Handle an incoming JSON-RPC request
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {}", request.method);

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => self
                .session
                .require_handshake_started(&request.method)
                .map(|_| serde_json::json!({}))
                .map_err(JsonRpcError::from),
            method => match self.session.require_ready(method) {
                Err(e) => {
                    warn!("Rejecting request '{}': {}", method, e);
                    Err(e.into())
                }
                Ok(()) => match method {
                    "tools/list" => self.handle_tools_list(),
                    "tools/call" => self.handle_tools_call(request.params).await,
                    _ => {
                        warn!("Unknown method: {}", method);
                        Err(JsonRpcError::method_not_found(method))
                    }
                },
            },
        };

        match result {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(Some(request.id), error),
        }
    }

    fn handle_notification(&mut self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => {
                self.session.on_initialized();
            }
            method => debug!("Ignoring notification: {}", method),
        }
    }

    fn handle_initialize(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let result = self.session.begin_initialize(params)?;
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.registry.list_tools(),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| DispatchError::InvalidParams(e.to_string()))?,
            None => return Err(DispatchError::InvalidParams("missing params".to_string()).into()),
        };

        let result = self.registry.call_tool(&request.name, request.arguments).await?;
        if result.is_error {
            info!("Tool '{}' reported an error outcome", request.name);
        }
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.session.state()
    }
}
