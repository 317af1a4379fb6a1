//! Input validation for outgoing mail.

use std::sync::OnceLock;

use regex::Regex;

use super::{MAX_BODY_CHARS, MAX_SUBJECT_CHARS};
use crate::storage::MailError;

fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("address pattern is a valid regex")
    })
}

/// Check that `address` looks like `local@domain.tld`
pub fn validate_address(address: &str) -> Result<(), MailError> {
    if address_regex().is_match(address) {
        Ok(())
    } else {
        Err(MailError::InvalidAddress(address.to_string()))
    }
}

/// Strip NUL and other control characters, then trim surrounding whitespace.
pub fn sanitize_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn validate_subject(subject: &str) -> Result<(), MailError> {
    if subject.trim().chars().count() > MAX_SUBJECT_CHARS {
        return Err(MailError::InvalidContent(format!(
            "subject too long (max {} characters)",
            MAX_SUBJECT_CHARS
        )));
    }
    Ok(())
}

pub fn validate_body(body: &str) -> Result<(), MailError> {
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(MailError::InvalidContent(format!(
            "body too long (max {} characters)",
            MAX_BODY_CHARS
        )));
    }
    Ok(())
}
