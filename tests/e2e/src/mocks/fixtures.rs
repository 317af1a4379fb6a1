//! Test Data Factory
//!
//! Builds realistic messages with deterministic, strictly increasing dates
//! so "newest first" ordering is predictable.

use chrono::{DateTime, Duration, TimeZone, Utc};
use sapphire_duck_core::{IncomingEmail, Mailbox};

/// Factory for creating test mail
pub struct MailFactory;

impl MailFactory {
    /// Base timestamp all fixture dates count up from
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Inbox message for `to`; `sequence` orders messages by date
    pub fn incoming(to: &str, subject: &str, sequence: usize) -> IncomingEmail {
        IncomingEmail {
            from: format!("sender{}@pond.example.org", sequence % 3),
            to: to.to_string(),
            subject: subject.to_string(),
            body: format!("Hello,\n\nThis is message number {}.\n\n-- Pond", sequence),
            folder: None,
            date: Some(Self::epoch() + Duration::minutes(sequence as i64)),
        }
    }

    /// Message into a non-default folder
    pub fn in_folder(to: &str, folder: &str, subject: &str, sequence: usize) -> IncomingEmail {
        IncomingEmail {
            folder: Some(folder.to_string()),
            ..Self::incoming(to, subject, sequence)
        }
    }

    /// A short newsletter-and-personal mix: 3 inbox messages and 2 archived.
    /// Returns the inbox ids, oldest first.
    pub fn create_mixed_inbox(mailbox: &Mailbox, account: &str) -> Vec<i64> {
        let inbox = ["Weekly pond digest", "Lunch on Friday?", "Your feather order shipped"];
        let ids = inbox
            .iter()
            .enumerate()
            .map(|(i, subject)| {
                mailbox
                    .deliver(Self::incoming(account, subject, i))
                    .expect("Failed to deliver fixture")
                    .id
            })
            .collect();

        for (i, subject) in ["Old receipt", "Old newsletter"].iter().enumerate() {
            mailbox
                .deliver(Self::in_folder(account, "Archive", subject, 100 + i))
                .expect("Failed to deliver fixture");
        }
        ids
    }
}
