//! Core client logic for QuillNote.
//! Owns session lifecycle and notes synchronization; UI surfaces only render
//! what this crate publishes.

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notes;
pub mod observe;
pub mod remote;
pub mod route;
pub mod session;

pub use client::QuillClient;
pub use config::{ConfigError, RemoteConfig};
pub use error::{CapabilityError, CoreError, CoreResult, ValidationError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::identity::{Identity, IdentityId};
pub use model::note::{Note, NoteDraft, NoteId};
pub use model::session::SessionState;
pub use notes::list::{NoteList, NotesView};
pub use notes::synchronizer::NotesSynchronizer;
pub use observe::{Observable, SubscriptionId};
pub use remote::appwrite::AppwriteClient;
pub use remote::memory::{InMemoryBackend, RemoteOp};
pub use remote::session_store::{
    FileSessionStore, MemorySessionStore, SessionStore, SessionStoreError, StoredSession,
};
pub use remote::{DocumentApi, IdentityApi, RemoteError, RemoteErrorKind};
pub use route::{resolve_route, Route};
pub use session::manager::SessionManager;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
