//! Remote backend configuration.
//!
//! # Responsibility
//! - Load backend coordinates from a JSON file or process environment.
//! - Normalize and validate values before any client is built.
//!
//! # Invariants
//! - `endpoint` is an `http(s)://` URL without trailing slash.
//! - Project, database and collection ids are non-empty after trimming.
//! - Without `session_dir` the remote session lasts only as long as the
//!   process.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_ENDPOINT: &str = "QUILLNOTE_ENDPOINT";
pub const ENV_PROJECT_ID: &str = "QUILLNOTE_PROJECT_ID";
pub const ENV_DATABASE_ID: &str = "QUILLNOTE_DATABASE_ID";
pub const ENV_COLLECTION_ID: &str = "QUILLNOTE_COLLECTION_ID";
pub const ENV_SESSION_DIR: &str = "QUILLNOTE_SESSION_DIR";

/// Configuration load/validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing config value `{0}`")]
    Missing(&'static str),
    #[error("invalid endpoint `{0}`; expected http:// or https:// URL")]
    InvalidEndpoint(String),
}

/// Coordinates of the hosted identity/document service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Base API URL, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    /// Collection that stores note documents.
    pub collection_id: String,
    /// Directory that keeps the session secret between launches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_dir: Option<PathBuf>,
}

impl RemoteConfig {
    /// Builds and validates a config from raw values.
    pub fn new(
        endpoint: &str,
        project_id: &str,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Self, ConfigError> {
        Self {
            endpoint: endpoint.to_string(),
            project_id: project_id.to_string(),
            database_id: database_id.to_string(),
            collection_id: collection_id.to_string(),
            session_dir: None,
        }
        .normalized()
    }

    /// Persists the remote session under `dir`.
    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    /// Parses a JSON document with camelCase keys.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<Self>(raw)?.normalized()
    }

    /// Reads a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Reads `QUILLNOTE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads values through `lookup`; used by `from_env` and tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let config = Self::new(
            &read(ENV_ENDPOINT)?,
            &read(ENV_PROJECT_ID)?,
            &read(ENV_DATABASE_ID)?,
            &read(ENV_COLLECTION_ID)?,
        )?;
        Ok(match lookup(ENV_SESSION_DIR) {
            Some(dir) if !dir.trim().is_empty() => config.with_session_dir(dir.trim()),
            _ => config,
        })
    }

    fn normalized(self) -> Result<Self, ConfigError> {
        let endpoint = self.endpoint.trim().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }
        Ok(Self {
            endpoint,
            project_id: require_non_empty(&self.project_id, "projectId")?,
            database_id: require_non_empty(&self.database_id, "databaseId")?,
            collection_id: require_non_empty(&self.collection_id, "collectionId")?,
            session_dir: self
                .session_dir
                .filter(|dir| !dir.as_os_str().is_empty()),
        })
    }
}

fn require_non_empty(value: &str, key: &'static str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing(key));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, RemoteConfig, ENV_COLLECTION_ID, ENV_DATABASE_ID, ENV_ENDPOINT,
        ENV_PROJECT_ID, ENV_SESSION_DIR,
    };
    use std::path::PathBuf;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn json_config_is_normalized() {
        let config = RemoteConfig::from_json_str(
            r#"{"endpoint":" https://cloud.example.io/v1/ ","projectId":"p1","databaseId":" db ","collectionId":"notes"}"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "https://cloud.example.io/v1");
        assert_eq!(config.database_id, "db");
    }

    #[test]
    fn rejects_non_http_endpoint_and_blank_ids() {
        let err = RemoteConfig::new("ftp://x", "p", "d", "c").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint(_)));

        let err = RemoteConfig::new("https://x", "p", "  ", "c").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("databaseId")));
    }

    #[test]
    fn lookup_reports_first_missing_variable() {
        let values = HashMap::from([
            (ENV_ENDPOINT, "http://localhost/v1"),
            (ENV_DATABASE_ID, "db"),
            (ENV_COLLECTION_ID, "notes"),
        ]);
        let err = RemoteConfig::from_lookup(|key| values.get(key).map(|v| v.to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("QUILLNOTE_PROJECT_ID")));
    }

    #[test]
    fn reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"endpoint":"http://localhost/v1","projectId":"p","databaseId":"d","collectionId":"c"}}"#
        )
        .unwrap();
        let config = RemoteConfig::from_file(file.path()).unwrap();
        assert_eq!(config.collection_id, "c");

        let missing = RemoteConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn session_dir_is_optional() {
        let config = RemoteConfig::from_json_str(
            r#"{"endpoint":"http://localhost/v1","projectId":"p","databaseId":"d","collectionId":"c"}"#,
        )
        .unwrap();
        assert_eq!(config.session_dir, None);

        let config = RemoteConfig::from_json_str(
            r#"{"endpoint":"http://localhost/v1","projectId":"p","databaseId":"d","collectionId":"c","sessionDir":"/data/quillnote"}"#,
        )
        .unwrap();
        assert_eq!(config.session_dir, Some(PathBuf::from("/data/quillnote")));
    }

    #[test]
    fn lookup_reads_session_dir() {
        let values = HashMap::from([
            (ENV_ENDPOINT, "http://localhost/v1"),
            (ENV_PROJECT_ID, "p"),
            (ENV_DATABASE_ID, "db"),
            (ENV_COLLECTION_ID, "notes"),
            (ENV_SESSION_DIR, " /tmp/quillnote "),
        ]);
        let config =
            RemoteConfig::from_lookup(|key| values.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.session_dir, Some(PathBuf::from("/tmp/quillnote")));
    }
}
