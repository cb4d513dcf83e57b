//! Remote identity and document service contracts.
//!
//! # Responsibility
//! - Define the async API surface the core consumes from the backend.
//! - Normalize every transport failure into one of four `RemoteErrorKind`s.
//!
//! # Invariants
//! - Implementations never assign note ids on behalf of the client; the
//!   backend does.
//! - Implementations must not log passwords or note content.
//!
//! # See also
//! - `appwrite` for the HTTP implementation, `memory` for the in-process fake.

pub mod appwrite;
pub mod memory;
pub mod session_store;

use crate::model::identity::{Identity, IdentityId, SessionToken};
use crate::model::note::{Note, NoteDraft, NoteId};
use async_trait::async_trait;
use thiserror::Error;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure class reported by a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// Connectivity or server availability failure.
    Network,
    /// Missing, invalid or expired remote session.
    Unauthorized,
    /// Addressed resource does not exist.
    NotFound,
    /// Request fields rejected by the service.
    Rejected,
}

impl RemoteErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
        }
    }
}

/// Transport-level error returned by remote implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error: {message}", .kind.as_str())]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Rejected, message)
    }
}

/// Remote identity service.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Creates an account; does not open a session.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Identity>;
    /// Opens an email/password session.
    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<SessionToken>;
    /// Returns the identity bound to the current session.
    async fn current_identity(&self) -> RemoteResult<Identity>;
    /// Terminates the current session.
    async fn delete_session(&self) -> RemoteResult<()>;
}

/// Remote per-user document store holding notes.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Lists all notes of `owner_id` in remote order.
    async fn list_documents(&self, owner_id: &IdentityId) -> RemoteResult<Vec<Note>>;
    /// Creates one note and returns the stored record.
    async fn create_document(&self, owner_id: &IdentityId, draft: &NoteDraft)
        -> RemoteResult<Note>;
    /// Replaces title and content of one note.
    async fn update_document(&self, note_id: &NoteId, draft: &NoteDraft) -> RemoteResult<Note>;
    /// Deletes one note.
    async fn delete_document(&self, note_id: &NoteId) -> RemoteResult<()>;
}
