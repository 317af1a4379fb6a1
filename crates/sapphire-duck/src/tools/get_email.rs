//! get_email Tool
//!
//! Full message by id, including the body. Fetching marks it read.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use sapphire_duck_core::{EmailMessage, Mailbox};

use crate::protocol::messages::{Content, ToolDescriptor};
use crate::registry::{Tool, ToolError};

/// Input schema for get_email tool
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": {
                "type": "integer",
                "description": "ID of the email, as shown by read_emails"
            },
            "account": {
                "type": "string",
                "description": "Email account that owns the message (optional, uses first configured account if not specified)"
            }
        },
        "required": ["id"]
    })
}

#[derive(Debug, Deserialize)]
struct GetEmailArgs {
    id: Value,
    account: Option<String>,
}

pub struct GetEmailTool {
    mailbox: Arc<Mailbox>,
}

impl GetEmailTool {
    pub fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }
}

fn render(message: &EmailMessage) -> String {
    format!(
        "{}\nTo: {}\nFolder: {}\n\n{}",
        message.summary(),
        message.to.join(", "),
        message.folder,
        message.body
    )
}

#[async_trait]
impl Tool for GetEmailTool {
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "get_email".to_string(),
            description: "Retrieve a single email by ID, including its body, and mark it as read.".to_string(),
            input_schema: schema(),
        }
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Vec<Content>, ToolError> {
        let args: GetEmailArgs = serde_json::from_value(Value::Object(arguments))
            .map_err(|e| ToolError::InvalidArgument(e.to_string()))?;
        let id = args
            .id
            .as_i64()
            .or_else(|| args.id.as_f64().map(|f| f as i64))
            .ok_or_else(|| ToolError::InvalidArgument(format!("'id' must be an integer, got {}", args.id)))?;

        let message = self.mailbox.get_message(id, args.account.as_deref())?;
        Ok(vec![Content::text(render(&message))])
    }
}
