use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use quillnote_core::{QuillClient, RemoteConfig};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "correct-horse";
const PROJECT: &str = "p1";
const SESSION_COOKIE: &str = "a_session_p1";

/// Account endpoints of a hosted backend, keyed on the session cookie.
#[derive(Default)]
struct FakeAccounts {
    sessions: Mutex<HashSet<String>>,
    issued: Mutex<u32>,
}

type Accounts = Arc<FakeAccounts>;

impl FakeAccounts {
    fn authorized(&self, headers: &HeaderMap) -> Option<String> {
        let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
        let secret = cookies
            .split("; ")
            .find_map(|pair| pair.strip_prefix(&format!("{SESSION_COOKIE}=")))?;
        self.sessions
            .lock()
            .contains(secret)
            .then(|| secret.to_string())
    }

    fn revoke_all(&self) {
        self.sessions.lock().clear();
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "User (role: guests) missing scope (account)" })),
    )
        .into_response()
}

async fn create_session(State(accounts): State<Accounts>, Json(body): Json<Value>) -> Response {
    if body["email"] != EMAIL || body["password"] != PASSWORD {
        return unauthorized();
    }
    let secret = {
        let mut issued = accounts.issued.lock();
        *issued += 1;
        format!("secret-{}", *issued)
    };
    accounts.sessions.lock().insert(secret.clone());
    (
        StatusCode::CREATED,
        [(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}={secret}; Path=/; HttpOnly"),
        )],
        Json(json!({ "$id": "s1", "userId": "u1" })),
    )
        .into_response()
}

async fn current_account(State(accounts): State<Accounts>, headers: HeaderMap) -> Response {
    match accounts.authorized(&headers) {
        Some(_) => Json(json!({ "$id": "u1", "name": "Ada", "email": EMAIL })).into_response(),
        None => unauthorized(),
    }
}

async fn delete_current(State(accounts): State<Accounts>, headers: HeaderMap) -> Response {
    match accounts.authorized(&headers) {
        Some(secret) => {
            accounts.sessions.lock().remove(&secret);
            StatusCode::NO_CONTENT.into_response()
        }
        None => unauthorized(),
    }
}

async fn start_backend() -> (String, Accounts) {
    let accounts = Accounts::default();
    let app = Router::new()
        .route("/v1/account", get(current_account))
        .route("/v1/account/sessions/email", post(create_session))
        .route("/v1/account/sessions/current", delete(delete_current))
        .with_state(accounts.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("fake backend address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/v1"), accounts)
}

fn config(endpoint: &str, session_dir: &Path) -> RemoteConfig {
    RemoteConfig::new(endpoint, PROJECT, "db", "notes")
        .expect("valid config")
        .with_session_dir(session_dir)
}

#[tokio::test]
async fn signed_in_session_survives_a_relaunch() {
    let (endpoint, _accounts) = start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");

    {
        let first = QuillClient::from_config(config(&endpoint, dir.path())).expect("client");
        let identity = first
            .session()
            .login(EMAIL, PASSWORD)
            .await
            .expect("login should succeed");
        assert_eq!(identity.id.as_str(), "u1");
    }
    assert!(session_file.exists());

    let relaunched = QuillClient::from_config(config(&endpoint, dir.path())).expect("client");
    let restored = relaunched
        .session()
        .restore()
        .await
        .expect("stored session should restore");
    assert_eq!(restored.email, EMAIL);
    assert!(relaunched.session().is_authenticated());

    relaunched
        .session()
        .logout()
        .await
        .expect("logout should succeed");
    assert!(!session_file.exists());

    let after_logout = QuillClient::from_config(config(&endpoint, dir.path())).expect("client");
    assert!(after_logout.session().restore().await.is_none());
}

#[tokio::test]
async fn revoked_session_is_dropped_from_storage() {
    let (endpoint, accounts) = start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");
    {
        let first = QuillClient::from_config(config(&endpoint, dir.path())).expect("client");
        first
            .session()
            .login(EMAIL, PASSWORD)
            .await
            .expect("login should succeed");
    }
    accounts.revoke_all();

    let relaunched = QuillClient::from_config(config(&endpoint, dir.path())).expect("client");
    assert!(relaunched.session().restore().await.is_none());
    assert!(!session_file.exists());
}

#[tokio::test]
async fn without_session_dir_a_relaunch_starts_signed_out() {
    let (endpoint, _accounts) = start_backend().await;
    let config = RemoteConfig::new(&endpoint, PROJECT, "db", "notes").expect("valid config");
    {
        let first = QuillClient::from_config(config.clone()).expect("client");
        first
            .session()
            .login(EMAIL, PASSWORD)
            .await
            .expect("login should succeed");
        assert!(first.session().is_authenticated());
    }

    let relaunched = QuillClient::from_config(config).expect("client");
    assert!(relaunched.session().restore().await.is_none());
}
