//! read_emails Tool
//!
//! Lists the newest messages of a folder, one content item per message.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Number, Value};

use sapphire_duck_core::{Mailbox, ReadQuery, DEFAULT_READ_LIMIT};

use crate::protocol::messages::{Content, ToolDescriptor};
use crate::registry::{Tool, ToolError};

/// Text of the single item returned when nothing matches
pub const NO_EMAILS: &str = "No emails found matching the criteria";

/// Input schema for read_emails tool
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "account": {
                "type": "string",
                "description": "Email account to read from (optional, uses first configured account if not specified)"
            },
            "folder": {
                "type": "string",
                "description": "Folder to read from (optional, defaults to INBOX)"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of emails to retrieve (optional, defaults to 10)",
                "default": DEFAULT_READ_LIMIT
            },
            "unread": {
                "type": "boolean",
                "description": "Only retrieve unread emails (optional, defaults to false)"
            }
        }
    })
}

#[derive(Debug, Default, Deserialize)]
struct ReadEmailsArgs {
    account: Option<String>,
    folder: Option<String>,
    limit: Option<Number>,
    unread: Option<bool>,
}

impl ReadEmailsArgs {
    /// Whole-valued floats count; zero or negative falls back to the default
    fn limit(&self) -> usize {
        let requested = self
            .limit
            .as_ref()
            .and_then(|n| n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)));
        match requested {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => DEFAULT_READ_LIMIT,
        }
    }
}

pub struct ReadEmailsTool {
    mailbox: Arc<Mailbox>,
}

impl ReadEmailsTool {
    pub fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl Tool for ReadEmailsTool {
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "read_emails".to_string(),
            description: "Read and retrieve emails from the configured email account, newest first.".to_string(),
            input_schema: schema(),
        }
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Vec<Content>, ToolError> {
        let args: ReadEmailsArgs = serde_json::from_value(Value::Object(arguments))
            .map_err(|e| ToolError::InvalidArgument(e.to_string()))?;

        let query = ReadQuery {
            limit: Some(args.limit()),
            account: args.account,
            folder: args.folder,
            unread_only: args.unread.unwrap_or(false),
        };

        let messages = self
            .mailbox
            .read(&query)
            .map_err(|e| ToolError::failed(format!("Failed to read emails: {}", e)))?;

        if messages.is_empty() {
            return Ok(vec![Content::text(NO_EMAILS)]);
        }
        Ok(messages.iter().map(|m| Content::text(m.summary())).collect())
    }
}
