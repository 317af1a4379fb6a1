//! Server assembly
//!
//! Shared by the `sapphire-duck` binary, its self-test and the end-to-end
//! tests: make sure configured accounts exist, then register the email tools
//! when there is at least one account to act for.

use std::sync::Arc;

use sapphire_duck_core::{MailError, Mailbox};
use tracing::{info, warn};

use crate::config::AccountConfig;
use crate::registry::{RegistryError, ToolRegistry};
use crate::server::McpServer;
use crate::tools;

/// Sent to clients in the initialize result
pub const INSTRUCTIONS: &str = "Sapphire Duck gives you access to the user's local mailbox. \
Use read_emails to list recent messages, get_email to open one by ID, and send_email to send \
a message on the user's behalf.";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("mailbox error: {0}")]
    Mailbox(#[from] MailError),
    #[error("tool registration failed: {0}")]
    Registry(#[from] RegistryError),
}

/// Register every configured account. Returns the number of accounts the
/// mailbox knows afterwards.
pub fn ensure_accounts(mailbox: &Mailbox, accounts: &[AccountConfig]) -> Result<usize, MailError> {
    for account in accounts {
        mailbox.ensure_account(&account.address, account.display_name.as_deref())?;
    }
    Ok(mailbox.accounts()?.len())
}

/// Email tools when the mailbox has an account, otherwise an empty registry
pub fn build_registry(mailbox: Arc<Mailbox>) -> Result<ToolRegistry, StartupError> {
    let accounts = mailbox.accounts()?;
    if accounts.is_empty() {
        warn!("No email accounts configured, email tools will not be available");
        return Ok(ToolRegistry::new());
    }

    let registry = tools::email_registry(mailbox)?;
    info!(
        accounts = accounts.len(),
        tools = registry.len(),
        "Email tools registered"
    );
    Ok(registry)
}

/// Ready-to-serve server for `mailbox`, after registering `accounts`
pub fn build_server(mailbox: Arc<Mailbox>, accounts: &[AccountConfig]) -> Result<McpServer, StartupError> {
    ensure_accounts(&mailbox, accounts)?;
    let registry = build_registry(mailbox)?;
    Ok(McpServer::new(Arc::new(registry)).with_instructions(INSTRUCTIONS))
}
