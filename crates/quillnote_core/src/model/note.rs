//! Note model and draft validation.
//!
//! # Responsibility
//! - Define the remote-backed `Note` record and its identifier type.
//! - Validate and normalize user input into a `NoteDraft` before any network
//!   call is attempted.
//!
//! # Invariants
//! - `NoteDraft` title and content are trimmed and never empty.
//! - `Note::id` and timestamps come from the remote store.

use crate::error::ValidationError;
use crate::model::identity::IdentityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const UNTITLED: &str = "Untitled";

/// Remote-assigned note identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user-owned note as confirmed by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// Owner reference used to scope list queries.
    pub owner_id: IdentityId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Title for list rows; blank titles render as `"Untitled"`.
    pub fn title_or_untitled(&self) -> &str {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            UNTITLED
        } else {
            trimmed
        }
    }

    /// Single-line content preview capped at `max_chars` characters.
    pub fn preview(&self, max_chars: usize) -> String {
        let flattened = self.content.split_whitespace().collect::<Vec<_>>().join(" ");
        if flattened.chars().count() <= max_chars {
            return flattened;
        }
        let mut preview = flattened.chars().take(max_chars).collect::<String>();
        preview.push_str("...");
        preview
    }
}

/// Validated title/content pair ready to be sent to the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    title: String,
    content: String,
}

impl NoteDraft {
    /// Trims both fields and rejects empty results.
    ///
    /// # Errors
    /// - `ValidationError::EmptyNoteFields` when either field is blank.
    pub fn new(title: &str, content: &str) -> Result<Self, ValidationError> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(ValidationError::EmptyNoteFields);
        }
        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}
