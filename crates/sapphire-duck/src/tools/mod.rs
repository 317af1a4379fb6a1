//! MCP Tools
//!
//! Email tools backed by the local [`Mailbox`]. Each tool owns a handle to
//! the mailbox and is registered into a [`ToolRegistry`] at startup.

pub mod get_email;
pub mod read_emails;
pub mod send_email;

use std::sync::Arc;

use sapphire_duck_core::{MailError, Mailbox};

use crate::registry::{RegistryError, ToolError, ToolRegistry};

pub use get_email::GetEmailTool;
pub use read_emails::ReadEmailsTool;
pub use send_email::SendEmailTool;

impl From<MailError> for ToolError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::InvalidAddress(_) | MailError::InvalidContent(_) => {
                ToolError::InvalidArgument(err.to_string())
            }
            other => ToolError::Failed(other.to_string()),
        }
    }
}

/// Register `send_email`, `read_emails` and `get_email`, in that order
pub fn register_email_tools(registry: &mut ToolRegistry, mailbox: Arc<Mailbox>) -> Result<(), RegistryError> {
    registry.register(Arc::new(SendEmailTool::new(mailbox.clone())))?;
    registry.register(Arc::new(ReadEmailsTool::new(mailbox.clone())))?;
    registry.register(Arc::new(GetEmailTool::new(mailbox)))?;
    Ok(())
}

/// Registry holding the email tools
pub fn email_registry(mailbox: Arc<Mailbox>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    register_email_tools(&mut registry, mailbox)?;
    Ok(registry)
}
