//! Authenticated principal model.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const FALLBACK_DISPLAY_NAME: &str = "User";

/// Remote-assigned identifier of an identity.
///
/// Also used as the owner reference stored on every note.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdentityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Profile of the authenticated user.
///
/// Immutable once fetched; a new login produces a new value instead of
/// mutating the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(id: IdentityId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Name used for greetings; blank names fall back to `"User"`.
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            FALLBACK_DISPLAY_NAME
        } else {
            trimmed
        }
    }
}

/// Opaque token returned by the identity service when a session is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub id: String,
    pub user_id: IdentityId,
}

#[cfg(test)]
mod tests {
    use super::{Identity, IdentityId};

    #[test]
    fn display_name_falls_back_for_blank_names() {
        let identity = Identity::new(IdentityId::new("u1"), "   ", "a@b.com");
        assert_eq!(identity.display_name(), "User");

        let named = Identity::new(IdentityId::new("u2"), " Ada ", "ada@b.com");
        assert_eq!(named.display_name(), "Ada");
    }
}
