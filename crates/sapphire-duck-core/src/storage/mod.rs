//! Storage Module
//!
//! SQLite-backed mailbox with:
//! - Ordered account registry (first account is the default)
//! - Per-account folders with unread tracking
//! - Versioned schema migrations

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{MailError, Mailbox, Result};
