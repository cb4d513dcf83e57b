//! Core error taxonomy.
//!
//! # Responsibility
//! - Map remote transport failures into client-facing error kinds.
//! - Provide actionable user messages for every failure.
//!
//! # Invariants
//! - `Validation` errors are produced before any network call, except
//!   `ValidationError::Rejected` which carries a remote field rejection.
//! - `Authorization` errors always trigger a session reset in the component
//!   that observes them.

use crate::remote::{RemoteError, RemoteErrorKind};
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Input rejected before (or by) the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Name is required for registration")]
    MissingName,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least 8 characters long")]
    PasswordTooShort,
    #[error("Please fill in both title and content")]
    EmptyNoteFields,
    /// Field rejected by the remote service (duplicate account, bad value).
    #[error("{0}")]
    Rejected(String),
}

/// Operation not permitted in the current session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("You must be logged in to manage notes")]
    NotAuthenticated,
    #[error("already logged in; log out first")]
    AlreadyAuthenticated,
    #[error("another sign-in request is still running")]
    AuthInProgress,
}

/// Client-facing error for every session and notes operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    /// Remote session invalid or expired.
    #[error("session is no longer valid: {0}")]
    Authorization(String),
    /// Target note no longer exists remotely.
    #[error("not found: {0}")]
    NotFound(String),
    /// Network or service availability failure; safe to retry manually.
    #[error("temporary failure: {0}")]
    Transient(String),
    /// Session changed while the request was in flight; result discarded.
    #[error("session changed before the request completed")]
    SessionChanged,
}

impl CoreError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Capability(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Stable machine-readable code for log lines and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Capability(_) => "capability",
            Self::Authorization(_) => "authorization",
            Self::NotFound(_) => "not_found",
            Self::Transient(_) => "transient",
            Self::SessionChanged => "session_changed",
        }
    }

    /// Message suitable for an alert or inline form error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Capability(err) => err.to_string(),
            Self::Authorization(_) | Self::SessionChanged => {
                "Your session has ended. Please log in again.".to_string()
            }
            Self::NotFound(_) => "This note no longer exists.".to_string(),
            Self::Transient(_) => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Like `user_message`, naming the failed action for transient errors
    /// (`"Failed to load notes. Please try again."`).
    pub fn action_message(&self, action: &str) -> String {
        match self {
            Self::Transient(_) => format!("Failed to {action}. Please try again."),
            _ => self.user_message(),
        }
    }
}

impl From<RemoteError> for CoreError {
    fn from(value: RemoteError) -> Self {
        match value.kind {
            RemoteErrorKind::Network => Self::Transient(value.message),
            RemoteErrorKind::Unauthorized => Self::Authorization(value.message),
            RemoteErrorKind::NotFound => Self::NotFound(value.message),
            RemoteErrorKind::Rejected => Self::Validation(ValidationError::Rejected(value.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreError, ValidationError};
    use crate::remote::{RemoteError, RemoteErrorKind};

    #[test]
    fn maps_every_remote_kind() {
        let cases = [
            (RemoteErrorKind::Network, "transient"),
            (RemoteErrorKind::Unauthorized, "authorization"),
            (RemoteErrorKind::NotFound, "not_found"),
            (RemoteErrorKind::Rejected, "validation"),
        ];
        for (kind, code) in cases {
            let err = CoreError::from(RemoteError::new(kind, "boom"));
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn remote_rejection_keeps_reason_for_the_user() {
        let err = CoreError::from(RemoteError::rejected("A user with the same email already exists"));
        assert_eq!(
            err,
            CoreError::Validation(ValidationError::Rejected(
                "A user with the same email already exists".to_string()
            ))
        );
        assert_eq!(err.user_message(), "A user with the same email already exists");
    }

    #[test]
    fn transient_errors_suggest_retry() {
        let err = CoreError::Transient("connection reset".to_string());
        assert!(err.user_message().contains("try again"));
        assert_eq!(
            err.action_message("load notes"),
            "Failed to load notes. Please try again."
        );
        assert_eq!(
            CoreError::NotFound("gone".to_string()).action_message("update note"),
            "This note no longer exists."
        );
    }

    #[test]
    fn validation_messages_match_form_copy() {
        assert_eq!(
            ValidationError::PasswordTooShort.to_string(),
            "Password must be at least 8 characters long"
        );
        assert_eq!(
            ValidationError::EmptyNoteFields.to_string(),
            "Please fill in both title and content"
        );
    }
}
