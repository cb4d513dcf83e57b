//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose session and notes use cases to Dart via FRB.
//! - Flatten core results into plain response envelopes.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Every envelope carries `ok`, a stable `error_code` on failure and a
//!   user-facing `message`.
//! - One client per process; `configure_remote` installs it.

use log::warn;
use once_cell::sync::OnceCell;
use quillnote_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CoreError, CoreResult, Note, NoteId, QuillClient, RemoteConfig, Route, SessionState,
};
use std::future::Future;
use tokio::runtime::Runtime;

const PREVIEW_CHARS: usize = 120;

static CLIENT: OnceCell<QuillClient> = OnceCell::new();
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// # FFI contract
/// - Sync call; may create the log directory.
/// - Idempotent for the same `level + log_dir`.
/// - Returns empty string on success and an error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Connects the process client to a hosted backend.
///
/// `session_dir` should be an app-private directory; the signed-in session
/// is kept there so `auth_restore` works after a relaunch.
///
/// # FFI contract
/// - Sync call, no network traffic.
/// - Returns empty string on success and an error message otherwise,
///   including when a client is already installed.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_remote(
    endpoint: String,
    project_id: String,
    database_id: String,
    collection_id: String,
    session_dir: Option<String>,
) -> String {
    if CLIENT.get().is_some() {
        return "client already configured".to_string();
    }
    let config = match RemoteConfig::new(&endpoint, &project_id, &database_id, &collection_id) {
        Ok(config) => config,
        Err(err) => return err.to_string(),
    };
    let config = match session_dir.filter(|dir| !dir.trim().is_empty()) {
        Some(dir) => config.with_session_dir(dir),
        None => config,
    };
    match QuillClient::from_config(config) {
        Ok(client) => match CLIENT.set(client) {
            Ok(()) => String::new(),
            Err(_) => "client already configured".to_string(),
        },
        Err(err) => err.to_string(),
    }
}

/// Session snapshot for UI rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// `unauthenticated|authenticating|authenticated|error`.
    pub state: String,
    pub user_id: Option<String>,
    /// Display name with the `User` fallback applied.
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub error_message: Option<String>,
    /// Screen to show when the user asks for home.
    pub route: String,
}

/// Response envelope for auth calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub ok: bool,
    pub error_code: Option<String>,
    pub message: String,
    pub session: SessionSnapshot,
}

/// Note projection for list and detail screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub id: String,
    /// Title with the `Untitled` fallback applied.
    pub title: String,
    pub content: String,
    pub preview: String,
    /// RFC 3339 timestamps.
    pub created_at: String,
    pub updated_at: String,
}

/// Response envelope for list calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesResponse {
    pub ok: bool,
    pub items: Vec<NoteItem>,
    pub error_code: Option<String>,
    pub message: String,
}

/// Response envelope for single-note mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteActionResponse {
    pub ok: bool,
    pub note: Option<NoteItem>,
    pub error_code: Option<String>,
    pub message: String,
}

impl NoteActionResponse {
    fn success(note: Option<NoteItem>, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            note,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            note: None,
            error_code: Some(code.to_string()),
            message: message.into(),
        }
    }
}

/// Current session state; never blocks on the network.
#[flutter_rust_bridge::frb(sync)]
pub fn session_snapshot() -> SessionSnapshot {
    match CLIENT.get() {
        Some(client) => snapshot(client),
        None => SessionSnapshot {
            state: SessionState::Unauthenticated.label().to_string(),
            user_id: None,
            display_name: None,
            email: None,
            error_message: None,
            route: Route::Loading.as_str().to_string(),
        },
    }
}

/// Resolves the screen for `requested` (`loading|auth|home|notes`).
///
/// Unknown names are treated as `home`.
#[flutter_rust_bridge::frb(sync)]
pub fn current_route(requested: String) -> String {
    let requested = parse_route(&requested);
    match CLIENT.get() {
        Some(client) => client.route(requested).as_str().to_string(),
        None => Route::Loading.as_str().to_string(),
    }
}

/// Restores a remote session at launch and loads notes when signed in.
pub fn auth_restore() -> AuthResponse {
    with_client_auth("restore your session", |client| async move {
        client.start().await;
        CoreResult::Ok(())
    })
}

pub fn auth_login(email: String, password: String) -> AuthResponse {
    with_client_auth("log in", |client| async move {
        let signed_in = client.session().login(&email, &password).await;
        if signed_in.is_ok() {
            let _ = client.notes().fetch_all().await;
        }
        signed_in.map(|_| ())
    })
}

pub fn auth_register(email: String, password: String, name: String) -> AuthResponse {
    with_client_auth("register", |client| async move {
        let signed_in = client.session().register(&email, &password, &name).await;
        if signed_in.is_ok() {
            let _ = client.notes().fetch_all().await;
        }
        signed_in.map(|_| ())
    })
}

/// Signs out. The local session is reset even when the envelope reports a
/// remote failure.
pub fn auth_logout() -> AuthResponse {
    with_client_auth("log out", |client| async move {
        client.session().logout().await
    })
}

/// Local note list; never blocks on the network.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_list() -> NotesResponse {
    match CLIENT.get() {
        Some(client) => {
            let view = client.notes().view();
            NotesResponse {
                ok: view.last_error.is_none(),
                items: view.notes.iter().map(to_note_item).collect(),
                error_code: view.last_error.as_ref().map(|_| "fetch_failed".to_string()),
                message: view.last_error.unwrap_or_default(),
            }
        }
        None => notes_failure("not_configured", "client is not configured"),
    }
}

/// Reloads the note list from the backend.
pub fn notes_fetch_all() -> NotesResponse {
    let result = with_client("load notes", |client| async move {
        client.notes().fetch_all().await
    });
    match result {
        Ok(notes) => NotesResponse {
            ok: true,
            items: notes.iter().map(to_note_item).collect(),
            error_code: None,
            message: String::new(),
        },
        Err((code, message)) => notes_failure(&code, message),
    }
}

pub fn notes_create(title: String, content: String) -> NoteActionResponse {
    let result = with_client("create note", |client| async move {
        client.notes().create(&title, &content).await
    });
    match result {
        Ok(note) => NoteActionResponse::success(Some(to_note_item(&note)), "Note created"),
        Err((code, message)) => NoteActionResponse::failure(&code, message),
    }
}

pub fn notes_update(note_id: String, title: String, content: String) -> NoteActionResponse {
    let result = with_client("update note", |client| async move {
        client
            .notes()
            .update(&NoteId::new(note_id), &title, &content)
            .await
    });
    match result {
        Ok(note) => NoteActionResponse::success(Some(to_note_item(&note)), "Note updated"),
        Err((code, message)) => NoteActionResponse::failure(&code, message),
    }
}

pub fn notes_delete(note_id: String) -> NoteActionResponse {
    let result = with_client("delete note", |client| async move {
        client.notes().delete(&NoteId::new(note_id)).await
    });
    match result {
        Ok(()) => NoteActionResponse::success(None, "Note deleted"),
        Err((code, message)) => NoteActionResponse::failure(&code, message),
    }
}

fn runtime() -> Result<&'static Runtime, String> {
    RUNTIME.get_or_try_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("quillnote-io")
            .enable_all()
            .build()
            .map_err(|err| format!("failed to start async runtime: {err}"))
    })
}

/// Runs one core use case on the FFI runtime.
///
/// Errors come back as `(error_code, user_message)`; transient failures name
/// `action`.
fn with_client<F, Fut, T>(action: &str, op: F) -> Result<T, (String, String)>
where
    F: FnOnce(&'static QuillClient) -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let client = CLIENT.get().ok_or_else(|| {
        warn!("event=ffi_call module=ffi status=error error_code=not_configured");
        (
            "not_configured".to_string(),
            "client is not configured".to_string(),
        )
    })?;
    let runtime = runtime().map_err(|message| ("runtime".to_string(), message))?;
    runtime
        .block_on(op(client))
        .map_err(|err| (err.code().to_string(), err.action_message(action)))
}

fn with_client_auth<F, Fut>(action: &str, op: F) -> AuthResponse
where
    F: FnOnce(&'static QuillClient) -> Fut,
    Fut: Future<Output = Result<(), CoreError>>,
{
    let result = with_client(action, op);
    let session = session_snapshot();
    match result {
        Ok(()) => AuthResponse {
            ok: true,
            error_code: None,
            message: String::new(),
            session,
        },
        Err((code, message)) => AuthResponse {
            ok: false,
            error_code: Some(code),
            message,
            session,
        },
    }
}

fn snapshot(client: &QuillClient) -> SessionSnapshot {
    let state = client.session().state();
    let identity = state.identity();
    SessionSnapshot {
        state: state.label().to_string(),
        user_id: identity.map(|identity| identity.id.to_string()),
        display_name: identity.map(|identity| identity.display_name().to_string()),
        email: identity.map(|identity| identity.email.clone()),
        error_message: match &state {
            SessionState::Error(reason) => Some(reason.clone()),
            _ => None,
        },
        route: client.route(Route::Home).as_str().to_string(),
    }
}

fn notes_failure(code: &str, message: impl Into<String>) -> NotesResponse {
    NotesResponse {
        ok: false,
        items: Vec::new(),
        error_code: Some(code.to_string()),
        message: message.into(),
    }
}

fn to_note_item(note: &Note) -> NoteItem {
    NoteItem {
        id: note.id.to_string(),
        title: note.title_or_untitled().to_string(),
        content: note.content.clone(),
        preview: note.preview(PREVIEW_CHARS),
        created_at: note.created_at.to_rfc3339(),
        updated_at: note.updated_at.to_rfc3339(),
    }
}

fn parse_route(value: &str) -> Route {
    match value.trim().to_ascii_lowercase().as_str() {
        "loading" => Route::Loading,
        "auth" => Route::Auth,
        "notes" => Route::Notes,
        _ => Route::Home,
    }
}
