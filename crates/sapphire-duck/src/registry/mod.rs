//! Tool Registry & Dispatcher
//!
//! Tools are trait objects registered once at startup. The registry answers
//! `tools/list` in registration order and routes `tools/call` to the named
//! tool after checking its arguments against the declared input schema.

pub mod schema;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::protocol::messages::{CallToolResult, Content, ToolDescriptor};
use crate::protocol::types::JsonRpcError;

// ============================================================================
// TOOL CAPABILITY
// ============================================================================

/// A failure reported by a tool implementation. Surfaces to the client as
/// an `isError` result, never as a JSON-RPC error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        ToolError::Failed(message.into())
    }
}

/// Something the server can invoke on behalf of the client
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and input schema. Read once at registration.
    fn describe(&self) -> ToolDescriptor;

    /// Run with arguments that already passed schema validation
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Vec<Content>, ToolError>;
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),
}

/// Protocol-level `tools/call` failures
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("Invalid tools/call params: {0}")]
    InvalidParams(String),
    #[error("Tool '{0}' returned no content")]
    EmptyContent(String),
}

impl From<DispatchError> for JsonRpcError {
    fn from(err: DispatchError) -> Self {
        let message = err.to_string();
        match err {
            DispatchError::UnknownTool(_) => JsonRpcError::method_not_found_with_message(&message),
            DispatchError::InvalidArguments { .. } | DispatchError::InvalidParams(_) => {
                JsonRpcError::invalid_params(&message)
            }
            DispatchError::EmptyContent(_) => JsonRpcError::internal_error(&message),
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

struct Entry {
    descriptor: ToolDescriptor,
    tool: Arc<dyn Tool>,
}

/// Ordered name → tool mapping
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let descriptor = tool.describe();
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }
        debug!("Registered tool: {}", descriptor.name);
        self.index.insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(Entry { descriptor, tool });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in registration order
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Look up, validate and invoke a tool.
    ///
    /// The tool is resolved before its arguments are looked at, so an unknown
    /// name always wins over bad arguments.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult, DispatchError> {
        let entry = self
            .index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let arguments = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(DispatchError::InvalidArguments {
                    tool: name.to_string(),
                    reason: "arguments must be an object".to_string(),
                });
            }
        };

        schema::validate_arguments(&entry.descriptor.input_schema, &arguments).map_err(|reason| {
            DispatchError::InvalidArguments {
                tool: name.to_string(),
                reason,
            }
        })?;

        debug!("Invoking tool: {}", name);
        let outcome = AssertUnwindSafe(entry.tool.invoke(arguments)).catch_unwind().await;

        match outcome {
            Ok(Ok(content)) if content.is_empty() => {
                error!("Tool '{}' returned an empty content list", name);
                Err(DispatchError::EmptyContent(name.to_string()))
            }
            Ok(Ok(content)) => Ok(CallToolResult::success(content)),
            Ok(Err(e)) => {
                warn!("Tool '{}' failed: {}", name, e);
                Ok(CallToolResult::error(format!("Error: {}", e)))
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("Tool '{}' panicked: {}", name, reason);
                Ok(CallToolResult::error(format!("Error: tool '{}' panicked: {}", name, reason)))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
