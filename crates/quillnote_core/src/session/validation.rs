//! Local credential validation.
//!
//! Runs before any identity call so malformed input never costs a round trip.

use crate::error::{ValidationError, MIN_PASSWORD_CHARS};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Validates login input.
///
/// Checks run in form order: presence, email shape, password length.
pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    validate_email_and_password(email, password)
}

/// Validates registration input.
///
/// Same as `validate_login`, plus a non-blank `name` checked right after
/// presence of the credentials.
pub fn validate_registration(
    email: &str,
    password: &str,
    name: &str,
) -> Result<(), ValidationError> {
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    if name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    validate_email_and_password(email, password)
}

fn validate_email_and_password(email: &str, password: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Masks the local part of an email for log lines (`a***@b.com`).
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}
