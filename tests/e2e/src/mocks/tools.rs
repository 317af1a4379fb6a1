//! Mock tools
//!
//! Tools with scripted behaviour for exercising the dispatcher end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sapphire_duck::protocol::messages::{Content, ToolDescriptor};
use sapphire_duck::{Tool, ToolError};
use serde_json::{json, Map, Value};

fn descriptor(name: &str, input_schema: Value) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: format!("Mock tool '{}'", name),
        input_schema,
    }
}

/// Requires an integer `n`; answers with `n` items and counts calls
pub struct CountingTool {
    calls: Arc<AtomicUsize>,
}

impl CountingTool {
    pub fn with_counter() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Self { calls: calls.clone() }, calls)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn describe(&self) -> ToolDescriptor {
        descriptor(
            "count",
            json!({
                "type": "object",
                "properties": {"n": {"type": "integer"}},
                "required": ["n"],
                "additionalProperties": false
            }),
        )
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Vec<Content>, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let n = arguments.get("n").and_then(Value::as_f64).unwrap_or(0.0) as usize;
        Ok((1..=n.max(1)).map(|i| Content::text(i.to_string())).collect())
    }
}

/// Always reports a tool failure
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn describe(&self) -> ToolDescriptor {
        descriptor("fail", json!({"type": "object"}))
    }

    async fn invoke(&self, _arguments: Map<String, Value>) -> Result<Vec<Content>, ToolError> {
        Err(ToolError::failed("upstream mail server unreachable"))
    }
}

/// Panics inside the tool body
pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn describe(&self) -> ToolDescriptor {
        descriptor("panic", json!({"type": "object"}))
    }

    async fn invoke(&self, _arguments: Map<String, Value>) -> Result<Vec<Content>, ToolError> {
        panic!("mock tool panicked");
    }
}

/// Succeeds with no content at all
pub struct EmptyTool;

#[async_trait]
impl Tool for EmptyTool {
    fn describe(&self) -> ToolDescriptor {
        descriptor("empty", json!({"type": "object"}))
    }

    async fn invoke(&self, _arguments: Map<String, Value>) -> Result<Vec<Content>, ToolError> {
        Ok(Vec::new())
    }
}
