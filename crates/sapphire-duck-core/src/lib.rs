//! # Sapphire Duck Core
//!
//! Local mailbox engine behind the sapphire-duck email tools.
//!
//! - **Accounts**: addresses the server may read from and send as. The first
//!   account registered is the default when a caller names none.
//! - **Folders**: free-form per-account folders. `INBOX` receives local
//!   deliveries, `Sent` keeps a copy of everything an account sends.
//! - **Validation**: address syntax and subject/body limits are enforced
//!   before anything is written.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sapphire_duck_core::{Mailbox, OutgoingEmail, ReadQuery};
//!
//! let mailbox = Mailbox::open(None)?;
//! mailbox.ensure_account("me@example.com", None)?;
//!
//! mailbox.send(None, OutgoingEmail {
//!     to: "you@example.com".to_string(),
//!     subject: "Hello".to_string(),
//!     body: "Lunch?".to_string(),
//! })?;
//!
//! let recent = mailbox.read(&ReadQuery::default())?;
//! ```

pub mod mail;
pub mod storage;

pub use mail::{
    Account, EmailMessage, IncomingEmail, OutgoingEmail, ReadQuery, SendReceipt,
    DEFAULT_FOLDER, DEFAULT_READ_LIMIT, MAX_BODY_CHARS, MAX_SUBJECT_CHARS, SENT_FOLDER,
};
pub use mail::validate::{sanitize_input, validate_address, validate_body, validate_subject};
pub use storage::{Mailbox, MailError, Result};
