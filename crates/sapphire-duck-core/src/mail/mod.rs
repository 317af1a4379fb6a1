//! Mail Types
//!
//! The values that flow in and out of the mailbox:
//! - Accounts the server may act as
//! - Stored messages and the queries that select them
//! - Outgoing mail and the receipt returned once it is stored

pub mod validate;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Folder that local deliveries land in
pub const DEFAULT_FOLDER: &str = "INBOX";

/// Folder that keeps a copy of everything an account sends
pub const SENT_FOLDER: &str = "Sent";

/// Number of messages returned when a caller asks for none or a non-positive amount
pub const DEFAULT_READ_LIMIT: usize = 10;

/// RFC 5322 line length limit
pub const MAX_SUBJECT_CHARS: usize = 998;

pub const MAX_BODY_CHARS: usize = 50_000;

// ============================================================================
// ACCOUNTS
// ============================================================================

/// A mailbox account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// MESSAGES
// ============================================================================

/// A stored message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    /// Mailbox-wide numeric id (stable, monotonically increasing)
    pub id: i64,
    /// Globally unique message id
    pub message_id: String,
    /// Account that owns this copy
    pub account: String,
    pub folder: String,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub date: DateTime<Utc>,
    pub unread: bool,
}

impl EmailMessage {
    /// One-paragraph summary used in listings
    pub fn summary(&self) -> String {
        format!(
            "ID: {}\nFrom: {}\nSubject: {}\nDate: {}\nUnread: {}",
            self.id,
            self.from,
            self.subject,
            self.date.to_rfc3339(),
            self.unread
        )
    }
}

/// A message arriving from outside the mailbox (operator delivery, tests)
#[derive(Debug, Clone, Default)]
pub struct IncomingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Target folder, `INBOX` when unset
    pub folder: Option<String>,
    /// Delivery timestamp, now when unset
    pub date: Option<DateTime<Utc>>,
}

/// A message an account wants to send
#[derive(Debug, Clone, Default)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Result of a successful send
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub message_id: String,
    pub from: String,
    pub to: String,
    /// True when the recipient is a local account and got a copy in its inbox
    pub delivered_locally: bool,
}

/// Selection for [`crate::Mailbox::read`]
#[derive(Debug, Clone, Default)]
pub struct ReadQuery {
    /// Account to read from; the default account when `None` or empty
    pub account: Option<String>,
    /// Folder to read from; `INBOX` when `None` or empty
    pub folder: Option<String>,
    /// Maximum messages, newest first; `DEFAULT_READ_LIMIT` when `None` or zero
    pub limit: Option<usize>,
    pub unread_only: bool,
}

impl ReadQuery {
    pub fn folder_or_default(&self) -> &str {
        match self.folder.as_deref() {
            Some(f) if !f.trim().is_empty() => f.trim(),
            _ => DEFAULT_FOLDER,
        }
    }

    pub fn limit_or_default(&self) -> usize {
        match self.limit {
            Some(0) | None => DEFAULT_READ_LIMIT,
            Some(n) => n,
        }
    }
}
