//! SQLite Mailbox
//!
//! Single-connection store guarded by a mutex. Every public operation takes
//! `&self` so the mailbox can be shared behind an `Arc` by all tools.

use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::migrations::apply_migrations;
use crate::mail::validate::{sanitize_input, validate_address, validate_body, validate_subject};
use crate::mail::{
    Account, EmailMessage, IncomingEmail, OutgoingEmail, ReadQuery, SendReceipt, DEFAULT_FOLDER,
    SENT_FOLDER,
};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Mailbox error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Named account is not registered
    #[error("email account not found: {0}")]
    AccountNotFound(String),
    /// No account has been registered at all
    #[error("no email accounts configured")]
    NoAccounts,
    /// Message id does not exist for the account
    #[error("email with ID {0} not found")]
    MessageNotFound(i64),
    /// Malformed address
    #[error("invalid email format: {0}")]
    InvalidAddress(String),
    /// Subject or body rejected
    #[error("{0}")]
    InvalidContent(String),
    /// Mutex poisoned by a panicking holder
    #[error("mailbox lock poisoned")]
    LockPoisoned,
}

/// Mailbox result type
pub type Result<T> = std::result::Result<T, MailError>;

const DB_FILE_NAME: &str = "mailbox.db";

const MESSAGE_COLUMNS: &str =
    "id, message_id, account, folder, from_addr, to_addrs, subject, body, date, unread";

// ============================================================================
// MAILBOX
// ============================================================================

/// Local mailbox backed by SQLite
pub struct Mailbox {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Mailbox {
    /// Open (or create) the mailbox in `data_dir`, or in the platform data
    /// directory when `None`.
    pub fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        let dir = match data_dir {
            Some(d) => d,
            None => {
                let proj_dirs = ProjectDirs::from("com", "sapphire-duck", "sapphire-duck")
                    .ok_or_else(|| {
                        MailError::Init("Could not determine project directories".to_string())
                    })?;
                proj_dirs.data_dir().to_path_buf()
            }
        };

        std::fs::create_dir_all(&dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(&dir, perms);
        }

        let path = dir.join(DB_FILE_NAME);
        let conn = Connection::open(&path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&conn)?;
        let applied = apply_migrations(&conn)?;
        if applied > 0 {
            tracing::info!(applied, path = %path.display(), "Mailbox schema migrated");
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    /// Open a throwaway mailbox that lives only as long as the value
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        apply_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Database file backing this mailbox (`None` for in-memory mailboxes)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| MailError::LockPoisoned)
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    /// Register `address` if it is not known yet. A provided display name
    /// replaces the stored one.
    pub fn ensure_account(&self, address: &str, display_name: Option<&str>) -> Result<Account> {
        let address = address.trim();
        validate_address(address)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO accounts (address, display_name, created_at) VALUES (?1, ?2, ?3)",
            params![address, display_name, now_text()],
        )?;
        if let Some(name) = display_name {
            conn.execute(
                "UPDATE accounts SET display_name = ?1 WHERE address = ?2",
                params![name, address],
            )?;
        }

        conn.query_row(
            "SELECT address, display_name, created_at FROM accounts WHERE address = ?1",
            params![address],
            account_from_row,
        )
        .map_err(MailError::from)
    }

    /// All accounts in registration order
    pub fn accounts(&self) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT address, display_name, created_at FROM accounts ORDER BY rowid")?;
        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    /// Map an optional account name to a registered address. An absent or
    /// blank name selects the first registered account.
    pub fn resolve_account(&self, account: Option<&str>) -> Result<String> {
        let conn = self.lock()?;
        resolve_account_with(&conn, account)
    }

    // ========================================================================
    // MESSAGES
    // ========================================================================

    /// Drop a message into a local account's folder
    pub fn deliver(&self, email: IncomingEmail) -> Result<EmailMessage> {
        let from = email.from.trim().to_string();
        validate_address(&from)?;

        let subject = sanitize_input(&email.subject);
        validate_subject(&subject)?;
        validate_body(&email.body)?;

        let folder = match email.folder.as_deref().map(str::trim) {
            Some(f) if !f.is_empty() => f.to_string(),
            _ => DEFAULT_FOLDER.to_string(),
        };
        let date = email.date.unwrap_or_else(Utc::now);

        let conn = self.lock()?;
        let account = local_account(&conn, email.to.trim())?
            .ok_or_else(|| MailError::AccountNotFound(email.to.trim().to_string()))?;

        let row = NewMessage {
            message_id: new_message_id(),
            account: &account,
            folder: &folder,
            from: &from,
            to: std::slice::from_ref(&account),
            subject: &subject,
            body: &email.body,
            date,
            unread: true,
        };
        let id = insert_message(&conn, &row)?;
        tracing::debug!(id, account = %account, folder = %folder, "Delivered message");

        fetch_message(&conn, id, &account)?.ok_or(MailError::MessageNotFound(id))
    }

    /// Send from `account` (default account when `None`). The sender keeps a
    /// copy in `Sent`; a local recipient also gets one in its inbox.
    pub fn send(&self, account: Option<&str>, email: OutgoingEmail) -> Result<SendReceipt> {
        let to = email.to.trim().to_string();
        validate_address(&to)?;

        let subject = sanitize_input(&email.subject);
        validate_subject(&subject)?;
        let body = sanitize_input(&email.body);
        validate_body(&body)?;

        let mut conn = self.lock()?;
        let from = resolve_account_with(&conn, account)?;
        let message_id = new_message_id();
        let date = Utc::now();
        let recipients = vec![to.clone()];

        let tx = conn.transaction()?;
        insert_message(
            &tx,
            &NewMessage {
                message_id: message_id.clone(),
                account: &from,
                folder: SENT_FOLDER,
                from: &from,
                to: &recipients,
                subject: &subject,
                body: &body,
                date,
                unread: false,
            },
        )?;

        let local_recipient = local_account(&tx, &to)?;
        if let Some(ref recipient) = local_recipient {
            insert_message(
                &tx,
                &NewMessage {
                    message_id: message_id.clone(),
                    account: recipient,
                    folder: DEFAULT_FOLDER,
                    from: &from,
                    to: &recipients,
                    subject: &subject,
                    body: &body,
                    date,
                    unread: true,
                },
            )?;
        }
        tx.commit()?;

        tracing::info!(from = %from, to = %to, local = local_recipient.is_some(), "Sent message");

        Ok(SendReceipt {
            message_id,
            from,
            to,
            delivered_locally: local_recipient.is_some(),
        })
    }

    /// Newest messages first, bounded by the query limit
    pub fn read(&self, query: &ReadQuery) -> Result<Vec<EmailMessage>> {
        let conn = self.lock()?;
        let account = resolve_account_with(&conn, query.account.as_deref())?;
        let folder = query.folder_or_default();
        let limit = i64::try_from(query.limit_or_default()).unwrap_or(i64::MAX);

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE account = ?1 AND folder = ?2 AND (?3 = 0 OR unread = 1)
             ORDER BY date DESC, id DESC
             LIMIT ?4"
        );
        let mut stmt = conn.prepare(&sql)?;
        let messages = stmt
            .query_map(
                params![account, folder, query.unread_only as i64, limit],
                message_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    /// Fetch a full message and mark it read
    pub fn get_message(&self, id: i64, account: Option<&str>) -> Result<EmailMessage> {
        let conn = self.lock()?;
        let account = resolve_account_with(&conn, account)?;

        let mut message =
            fetch_message(&conn, id, &account)?.ok_or(MailError::MessageNotFound(id))?;
        if message.unread {
            conn.execute("UPDATE messages SET unread = 0 WHERE id = ?1", params![id])?;
            message.unread = false;
        }
        Ok(message)
    }

    /// Count messages in a folder
    pub fn count(&self, account: Option<&str>, folder: Option<&str>, unread_only: bool) -> Result<usize> {
        let conn = self.lock()?;
        let account = resolve_account_with(&conn, account)?;
        let folder = match folder.map(str::trim) {
            Some(f) if !f.is_empty() => f,
            _ => DEFAULT_FOLDER,
        };
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE account = ?1 AND folder = ?2 AND (?3 = 0 OR unread = 1)",
            params![account, folder, unread_only as i64],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

// ============================================================================
// ROW HELPERS
// ============================================================================

struct NewMessage<'a> {
    message_id: String,
    account: &'a str,
    folder: &'a str,
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    body: &'a str,
    date: DateTime<Utc>,
    unread: bool,
}

fn insert_message(conn: &Connection, message: &NewMessage<'_>) -> Result<i64> {
    let to_json = serde_json::to_string(message.to)
        .map_err(|e| MailError::Init(format!("failed to encode recipients: {}", e)))?;
    conn.execute(
        "INSERT INTO messages (message_id, account, folder, from_addr, to_addrs, subject, body, date, unread)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            message.message_id,
            message.account,
            message.folder,
            message.from,
            to_json,
            message.subject,
            message.body,
            datetime_text(&message.date),
            message.unread,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn fetch_message(conn: &Connection, id: i64, account: &str) -> Result<Option<EmailMessage>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1 AND account = ?2");
    conn.query_row(&sql, params![id, account], message_from_row)
        .optional()
        .map_err(MailError::from)
}

fn local_account(conn: &Connection, address: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT address FROM accounts WHERE address = ?1",
        params![address],
        |row| row.get(0),
    )
    .optional()
    .map_err(MailError::from)
}

fn resolve_account_with(conn: &Connection, account: Option<&str>) -> Result<String> {
    match account.map(str::trim) {
        Some(name) if !name.is_empty() => {
            local_account(conn, name)?.ok_or_else(|| MailError::AccountNotFound(name.to_string()))
        }
        _ => conn
            .query_row("SELECT address FROM accounts ORDER BY rowid LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or(MailError::NoAccounts),
    }
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let created_at: String = row.get(2)?;
    Ok(Account {
        address: row.get(0)?,
        display_name: row.get(1)?,
        created_at: parse_datetime(2, &created_at)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<EmailMessage> {
    let to_json: String = row.get(5)?;
    let to: Vec<String> = serde_json::from_str(&to_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let date: String = row.get(8)?;

    Ok(EmailMessage {
        id: row.get(0)?,
        message_id: row.get(1)?,
        account: row.get(2)?,
        folder: row.get(3)?,
        from: row.get(4)?,
        to,
        subject: row.get(6)?,
        body: row.get(7)?,
        date: parse_datetime(8, &date)?,
        unread: row.get(9)?,
    })
}

fn parse_datetime(column: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

// Fixed-width UTC timestamps so lexical order in SQL matches time order
fn datetime_text(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now_text() -> String {
    datetime_text(&Utc::now())
}

fn new_message_id() -> String {
    format!("<{}@sapphire-duck.local>", Uuid::new_v4())
}

// ============================================================================
// TESTS
// ============================================================================
