//! Persistence of the remote session secret across process restarts.
//!
//! # Responsibility
//! - Keep the session cookies issued by the backend so a relaunched client
//!   can restore the signed-in identity.
//!
//! # Invariants
//! - The file store writes through a temporary file and rename; a torn write
//!   never replaces a good session file.
//! - An unreadable or corrupt session file reads as "no session".

use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store io failure at `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("session store encode failure: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Cookies that authenticate one device session, keyed by cookie name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub cookies: BTreeMap<String, String>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for a `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// JSON object form used by the fallback cookie header.
    pub fn fallback_header(&self) -> String {
        serde_json::to_string(&self.cookies).unwrap_or_default()
    }
}

/// Storage for the current session secret.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<StoredSession>;
    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError>;
    fn clear(&self) -> Result<(), SessionStoreError>;
}

/// Keeps the session for the lifetime of the process only.
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<StoredSession> {
        self.session.lock().clone()
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        self.session.lock().take();
        Ok(())
    }
}

/// JSON file under an app-owned directory.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store backed by `<dir>/session.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<StoredSession> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(
                    "event=session_store_load module=remote status=error error_code=io error={}",
                    err
                );
                return None;
            }
        };
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(session) if !session.is_empty() => Some(session),
            Ok(_) => None,
            Err(err) => {
                warn!(
                    "event=session_store_load module=remote status=error error_code=parse error={}",
                    err
                );
                None
            }
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|err| self.io_error(err))?;
        }
        let encoded = serde_json::to_vec(session)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSessionStore, MemorySessionStore, SessionStore, StoredSession};
    use std::collections::BTreeMap;

    fn session(secret: &str) -> StoredSession {
        StoredSession {
            cookies: BTreeMap::from([("a_session_p1".to_string(), secret.to_string())]),
        }
    }

    #[test]
    fn file_store_survives_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        FileSessionStore::in_dir(dir.path().join("nested"))
            .save(&session("s3cret"))
            .unwrap();

        let reopened = FileSessionStore::in_dir(dir.path().join("nested"));
        assert_eq!(reopened.load(), Some(session("s3cret")));
        reopened.clear().unwrap();
        assert_eq!(reopened.load(), None);
        reopened.clear().unwrap();
    }

    #[test]
    fn corrupt_file_reads_as_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::in_dir(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn memory_store_round_trips_within_process() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load(), None);
        store.save(&session("abc")).unwrap();
        assert_eq!(store.load(), Some(session("abc")));
        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn headers_carry_every_cookie() {
        let mut stored = session("abc");
        stored
            .cookies
            .insert("a_session_p1_legacy".to_string(), "def".to_string());
        assert_eq!(
            stored.cookie_header(),
            "a_session_p1=abc; a_session_p1_legacy=def"
        );
        assert_eq!(
            stored.fallback_header(),
            r#"{"a_session_p1":"abc","a_session_p1_legacy":"def"}"#
        );
    }
}
