//! Authentication state published to every UI observer.

use crate::model::identity::{Identity, IdentityId};
use serde::{Deserialize, Serialize};

/// Live authentication state of the process.
///
/// `Error` is transient: the session manager publishes it and then settles to
/// `Unauthenticated`, so observers can show the reason once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated(Identity),
    Error(String),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn owner_id(&self) -> Option<&IdentityId> {
        self.identity().map(|identity| &identity.id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn is_authenticating(&self) -> bool {
        matches!(self, Self::Authenticating)
    }

    /// Stable short label used in log lines and FFI envelopes.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated(_) => "authenticated",
            Self::Error(_) => "error",
        }
    }
}
