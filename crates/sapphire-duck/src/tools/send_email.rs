//! send_email Tool
//!
//! Sends from a local account. The sender keeps a copy in `Sent`; a local
//! recipient also receives one in its inbox.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use sapphire_duck_core::{Mailbox, OutgoingEmail};

use crate::protocol::messages::{Content, ToolDescriptor};
use crate::registry::{Tool, ToolError};

/// Input schema for send_email tool
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "to": {
                "type": "string",
                "description": "Email address of the recipient"
            },
            "subject": {
                "type": "string",
                "description": "Subject line of the email"
            },
            "body": {
                "type": "string",
                "description": "Body content of the email"
            },
            "account": {
                "type": "string",
                "description": "Email account to send from (optional, uses first configured account if not specified)"
            },
            "from": {
                "type": "string",
                "description": "Email address to send from (alias for account, optional)"
            }
        },
        "required": ["to", "subject", "body"]
    })
}

#[derive(Debug, Deserialize)]
struct SendEmailArgs {
    to: String,
    subject: String,
    body: String,
    account: Option<String>,
    from: Option<String>,
}

impl SendEmailArgs {
    /// `account` wins; `from` is accepted as an alias
    fn sender(&self) -> Option<&str> {
        [self.account.as_deref(), self.from.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

pub struct SendEmailTool {
    mailbox: Arc<Mailbox>,
}

impl SendEmailTool {
    pub fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "send_email".to_string(),
            description: "Send an email message from the configured email account to a specified recipient."
                .to_string(),
            input_schema: schema(),
        }
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Vec<Content>, ToolError> {
        let args: SendEmailArgs = serde_json::from_value(Value::Object(arguments))
            .map_err(|e| ToolError::InvalidArgument(e.to_string()))?;
        if args.to.trim().is_empty() {
            return Err(ToolError::InvalidArgument("'to' must not be empty".to_string()));
        }

        let sender = args.sender().map(str::to_string);
        let email = OutgoingEmail {
            to: args.to,
            subject: args.subject,
            body: args.body,
        };

        let receipt = self.mailbox.send(sender.as_deref(), email).map_err(|e| {
            warn!(account = ?sender, "send_email failed: {}", e);
            ToolError::from(e)
        })?;

        Ok(vec![Content::text(format!("Email sent successfully to {}", receipt.to))])
    }
}
