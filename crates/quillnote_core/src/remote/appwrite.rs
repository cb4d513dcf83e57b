//! Typed HTTP client for an Appwrite-compatible backend.
//!
//! # Responsibility
//! - Implement `IdentityApi` over the account endpoints and `DocumentApi`
//!   over one database collection.
//! - Translate HTTP statuses and transport errors into `RemoteError`.
//! - Carry the session cookies issued at sign-in on every request and keep
//!   them in a `SessionStore` so a relaunch can restore the session.
//!
//! # Invariants
//! - One client instance represents one device session.
//! - The stored session is dropped on sign-out, before a new sign-in and on
//!   any HTTP 401.
//! - Note documents carry `title`, `content` and `userId` attributes.
//! - Listing pages through the collection until the reported total is read.

use crate::config::RemoteConfig;
use crate::model::identity::{Identity, IdentityId, SessionToken};
use crate::model::note::{Note, NoteDraft, NoteId};
use crate::remote::session_store::{
    FileSessionStore, MemorySessionStore, SessionStore, StoredSession,
};
use crate::remote::{DocumentApi, IdentityApi, RemoteError, RemoteErrorKind, RemoteResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, COOKIE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";
const SESSION_COOKIE_PREFIX: &str = "a_session_";
const UNIQUE_ID: &str = "unique()";
const OWNER_ATTRIBUTE: &str = "userId";
const LIST_PAGE_LIMIT: u32 = 100;

// ── Wire types ──────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AccountBody {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentBody {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "$createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    updated_at: DateTime<Utc>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentListBody {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    documents: Vec<DocumentBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct NoteData<'a> {
    title: &'a str,
    content: &'a str,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

impl From<AccountBody> for Identity {
    fn from(value: AccountBody) -> Self {
        Identity::new(IdentityId::new(value.id), value.name, value.email)
    }
}

impl From<DocumentBody> for Note {
    fn from(value: DocumentBody) -> Self {
        Note {
            id: NoteId::new(value.id),
            owner_id: IdentityId::new(value.user_id),
            title: value.title,
            content: value.content,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

// ── Client impl ─────────────────────────────────────

/// HTTP client bound to one project and one notes collection.
pub struct AppwriteClient {
    config: RemoteConfig,
    client: reqwest::Client,
    store: Arc<dyn SessionStore>,
    session: RwLock<Option<StoredSession>>,
}

impl AppwriteClient {
    /// Builds a client whose session is kept under `config.session_dir`, or
    /// in memory when no directory is configured.
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        let store: Arc<dyn SessionStore> = match config.session_dir.as_ref() {
            Some(dir) => Arc::new(FileSessionStore::in_dir(dir)),
            None => Arc::new(MemorySessionStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Builds a client on an explicit session store; a session already in
    /// the store is sent with the first request.
    pub fn with_store(config: RemoteConfig, store: Arc<dyn SessionStore>) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| RemoteError::network(format!("http client setup failed: {err}")))?;
        let session = store.load();
        if session.is_some() {
            debug!("event=session_store_load module=remote status=ok");
        }
        Ok(Self {
            config,
            client,
            store,
            session: RwLock::new(session),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}{}", self.config.endpoint, path))
            .header(PROJECT_HEADER, self.config.project_id.as_str());
        match self.session.read().as_ref() {
            Some(session) => request
                .header(COOKIE, session.cookie_header())
                .header(FALLBACK_COOKIES_HEADER, session.fallback_header()),
            None => request,
        }
    }

    fn remember_session(&self, response: &Response) {
        let issued = response
            .cookies()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()));
        let session = StoredSession {
            cookies: session_cookies(response.headers(), issued),
        };
        if session.is_empty() {
            warn!("event=session_capture module=remote status=error error_code=no_session_cookie");
            return;
        }
        if let Err(err) = self.store.save(&session) {
            warn!(
                "event=session_store_save module=remote status=error error={}",
                err
            );
        }
        *self.session.write() = Some(session);
        info!("event=session_capture module=remote status=ok");
    }

    fn forget_session(&self, reason: &'static str) {
        let had_session = self.session.write().take().is_some();
        if let Err(err) = self.store.clear() {
            warn!(
                "event=session_store_clear module=remote status=error error={}",
                err
            );
        }
        if had_session {
            info!(
                "event=session_forget module=remote status=ok reason={}",
                reason
            );
        }
    }

    fn documents_path(&self) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.config.database_id, self.config.collection_id
        )
    }

    async fn send(&self, request: RequestBuilder, operation: &'static str) -> RemoteResult<Response> {
        let response = request.send().await.map_err(|err| {
            warn!(
                "event=remote_call module=remote status=error op={} error_code=transport",
                operation
            );
            RemoteError::network(format!("{operation} failed: {err}"))
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(
                "event=remote_call module=remote status=ok op={} http_status={}",
                operation,
                status.as_u16()
            );
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.forget_session("unauthorized");
        }
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        let kind = classify_status(status);
        warn!(
            "event=remote_call module=remote status=error op={} http_status={} error_code={}",
            operation,
            status.as_u16(),
            kind.as_str()
        );
        let message = if body.message.is_empty() {
            format!("{operation} returned HTTP {status}")
        } else {
            body.message
        };
        Err(RemoteError::new(kind, message))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> RemoteResult<T> {
        let response = self.send(request, operation).await?;
        parse_json(response, operation).await
    }
}

async fn parse_json<T: DeserializeOwned>(
    response: Response,
    operation: &'static str,
) -> RemoteResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| RemoteError::network(format!("parse {operation} response: {err}")))
}

#[async_trait]
impl IdentityApi for AppwriteClient {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Identity> {
        let body = json!({
            "userId": UNIQUE_ID,
            "email": email,
            "password": password,
            "name": name,
        });
        let account: AccountBody = self
            .send_json(self.request(Method::POST, "/account").json(&body), "create_account")
            .await?;
        Ok(account.into())
    }

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<SessionToken> {
        self.forget_session("new_sign_in");
        let body = json!({ "email": email, "password": password });
        let response = self
            .send(
                self.request(Method::POST, "/account/sessions/email").json(&body),
                "create_session",
            )
            .await?;
        self.remember_session(&response);
        let session: SessionBody = parse_json(response, "create_session").await?;
        Ok(SessionToken {
            id: session.id,
            user_id: IdentityId::new(session.user_id),
        })
    }

    async fn current_identity(&self) -> RemoteResult<Identity> {
        let account: AccountBody = self
            .send_json(self.request(Method::GET, "/account"), "current_identity")
            .await?;
        Ok(account.into())
    }

    async fn delete_session(&self) -> RemoteResult<()> {
        let result = self
            .send(
                self.request(Method::DELETE, "/account/sessions/current"),
                "delete_session",
            )
            .await;
        self.forget_session("sign_out");
        result.map(|_| ())
    }
}

#[async_trait]
impl DocumentApi for AppwriteClient {
    async fn list_documents(&self, owner_id: &IdentityId) -> RemoteResult<Vec<Note>> {
        let mut notes: Vec<Note> = Vec::new();
        let mut pages = 0u32;
        loop {
            let queries = list_queries(owner_id, notes.last().map(|note| &note.id));
            let params = queries
                .iter()
                .map(|query| ("queries[]", query.as_str()))
                .collect::<Vec<_>>();
            let page: DocumentListBody = self
                .send_json(
                    self.request(Method::GET, &self.documents_path()).query(&params),
                    "list_documents",
                )
                .await?;
            pages += 1;
            let received = page.documents.len();
            notes.extend(page.documents.into_iter().map(Note::from));
            if !has_next_page(received, notes.len(), page.total) {
                break;
            }
        }
        if pages > 1 {
            debug!(
                "event=list_documents module=remote status=ok pages={} count={}",
                pages,
                notes.len()
            );
        }
        Ok(notes)
    }

    async fn create_document(
        &self,
        owner_id: &IdentityId,
        draft: &NoteDraft,
    ) -> RemoteResult<Note> {
        let body = json!({
            "documentId": UNIQUE_ID,
            "data": NoteData {
                title: draft.title(),
                content: draft.content(),
                user_id: Some(owner_id.as_str()),
            },
        });
        let document: DocumentBody = self
            .send_json(
                self.request(Method::POST, &self.documents_path()).json(&body),
                "create_document",
            )
            .await?;
        Ok(document.into())
    }

    async fn update_document(&self, note_id: &NoteId, draft: &NoteDraft) -> RemoteResult<Note> {
        let body = json!({
            "data": NoteData {
                title: draft.title(),
                content: draft.content(),
                user_id: None,
            },
        });
        let path = format!("{}/{}", self.documents_path(), note_id);
        let document: DocumentBody = self
            .send_json(
                self.request(Method::PATCH, &path).json(&body),
                "update_document",
            )
            .await?;
        Ok(document.into())
    }

    async fn delete_document(&self, note_id: &NoteId) -> RemoteResult<()> {
        let path = format!("{}/{}", self.documents_path(), note_id);
        self.send(self.request(Method::DELETE, &path), "delete_document")
            .await?;
        Ok(())
    }
}

/// Maps an HTTP failure status onto the remote error taxonomy.
pub fn classify_status(status: StatusCode) -> RemoteErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteErrorKind::Unauthorized,
        StatusCode::NOT_FOUND => RemoteErrorKind::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteErrorKind::Rejected
        }
        _ => RemoteErrorKind::Network,
    }
}

/// Queries for one page of an owner's notes, newest first.
///
/// `after` is the last document of the previous page.
fn list_queries(owner_id: &IdentityId, after: Option<&NoteId>) -> Vec<String> {
    let mut queries = vec![
        json!({ "method": "equal", "attribute": OWNER_ATTRIBUTE, "values": [owner_id.as_str()] })
            .to_string(),
        json!({ "method": "orderDesc", "attribute": "$createdAt" }).to_string(),
        json!({ "method": "limit", "values": [LIST_PAGE_LIMIT] }).to_string(),
    ];
    if let Some(cursor) = after {
        queries.push(json!({ "method": "cursorAfter", "values": [cursor.as_str()] }).to_string());
    }
    queries
}

/// A short or empty page ends the listing even if `total` says otherwise.
fn has_next_page(received: usize, collected: usize, total: u64) -> bool {
    received as u64 >= u64::from(LIST_PAGE_LIMIT) && (collected as u64) < total
}

/// Session cookies from response cookies plus the fallback header some
/// deployments send when third-party cookies are blocked.
fn session_cookies(
    headers: &HeaderMap,
    cookies: impl Iterator<Item = (String, String)>,
) -> BTreeMap<String, String> {
    let mut session: BTreeMap<String, String> = cookies
        .filter(|(name, value)| name.starts_with(SESSION_COOKIE_PREFIX) && !value.is_empty())
        .collect();
    let fallback = headers
        .get(FALLBACK_COOKIES_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| serde_json::from_str::<BTreeMap<String, String>>(raw).ok())
        .unwrap_or_default();
    for (name, value) in fallback {
        if name.starts_with(SESSION_COOKIE_PREFIX) && !value.is_empty() {
            session.entry(name).or_insert(value);
        }
    }
    session
}
