use parking_lot::Mutex;
use quillnote_core::{
    CapabilityError, CoreError, InMemoryBackend, QuillClient, RemoteError, RemoteOp, Route,
    SessionState, ValidationError,
};
use std::sync::Arc;

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "correct-horse";

fn client_with_account() -> (QuillClient, Arc<InMemoryBackend>) {
    let (client, backend) = QuillClient::in_memory();
    backend.seed_account(EMAIL, PASSWORD, "Ada");
    (client, backend)
}

fn record_labels(client: &QuillClient) -> Arc<Mutex<Vec<&'static str>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    client
        .session()
        .subscribe(move |state: &SessionState| sink.lock().push(state.label()));
    seen
}

#[tokio::test]
async fn restore_without_remote_session_settles_unauthenticated() {
    let (client, backend) = client_with_account();
    assert_eq!(client.route(Route::Home), Route::Loading);

    assert!(client.session().restore().await.is_none());
    assert_eq!(client.session().state(), SessionState::Unauthenticated);
    assert!(client.session().restore_complete());
    assert_eq!(client.route(Route::Notes), Route::Auth);
    assert_eq!(backend.calls(RemoteOp::CurrentIdentity), 1);
}

#[tokio::test]
async fn restore_picks_up_existing_remote_session() {
    let (first, backend) = client_with_account();
    first
        .session()
        .login(EMAIL, PASSWORD)
        .await
        .expect("login should succeed");

    let relaunched = QuillClient::with_backend(backend.clone());
    let identity = relaunched
        .session()
        .restore()
        .await
        .expect("existing session should restore");
    assert_eq!(identity.email, EMAIL);
    assert!(relaunched.session().is_authenticated());
    assert_eq!(relaunched.route(Route::Auth), Route::Home);
}

#[tokio::test]
async fn restore_network_failure_is_not_surfaced() {
    let (client, backend) = client_with_account();
    backend.fail_next(RemoteOp::CurrentIdentity, RemoteError::network("offline"));

    assert!(client.session().restore().await.is_none());
    assert_eq!(client.session().state(), SessionState::Unauthenticated);
    assert!(client.session().restore_complete());
}

#[tokio::test]
async fn login_publishes_authenticating_then_authenticated() {
    let (client, _backend) = client_with_account();
    let seen = record_labels(&client);

    let identity = client
        .session()
        .login(EMAIL, PASSWORD)
        .await
        .expect("login should succeed");
    assert_eq!(identity.display_name(), "Ada");
    assert_eq!(
        *seen.lock(),
        vec!["unauthenticated", "authenticating", "authenticated"]
    );
}

#[tokio::test]
async fn short_password_fails_locally_without_network() {
    let (client, backend) = client_with_account();
    let seen = record_labels(&client);

    let err = client
        .session()
        .login("a@b.com", "short")
        .await
        .expect_err("short password must be rejected");
    assert_eq!(err, CoreError::Validation(ValidationError::PasswordTooShort));
    assert_eq!(backend.total_calls(), 0);
    assert_eq!(*seen.lock(), vec!["unauthenticated"]);
}

#[tokio::test]
async fn wrong_password_publishes_error_then_unauthenticated() {
    let (client, backend) = client_with_account();
    let seen = record_labels(&client);

    let err = client
        .session()
        .login(EMAIL, "wrong-password")
        .await
        .expect_err("wrong password must fail");
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::Rejected(_))
    ));
    assert_eq!(
        *seen.lock(),
        vec!["unauthenticated", "authenticating", "error", "unauthenticated"]
    );
    assert!(!backend.has_session());
}

#[tokio::test]
async fn register_creates_account_and_signs_in() {
    let (client, backend) = QuillClient::in_memory();

    let identity = client
        .session()
        .register("grace@example.com", "hopper-1906", "  Grace  ")
        .await
        .expect("register should succeed");
    assert_eq!(identity.name, "Grace");
    assert!(client.session().is_authenticated());
    assert_eq!(backend.calls(RemoteOp::CreateAccount), 1);
    assert_eq!(backend.calls(RemoteOp::CreateSession), 1);
}

#[tokio::test]
async fn register_duplicate_surfaces_service_reason() {
    let (client, _backend) = client_with_account();

    let err = client
        .session()
        .register(EMAIL, PASSWORD, "Ada again")
        .await
        .expect_err("duplicate account must fail");
    assert!(err.user_message().contains("already exists"));
    assert_eq!(client.session().state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn register_requires_name_before_any_call() {
    let (client, backend) = QuillClient::in_memory();

    let err = client
        .session()
        .register("grace@example.com", "hopper-1906", "   ")
        .await
        .expect_err("blank name must be rejected");
    assert_eq!(err, CoreError::Validation(ValidationError::MissingName));
    assert_eq!(err.user_message(), "Name is required for registration");
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn login_while_authenticated_is_a_capability_error() {
    let (client, backend) = client_with_account();
    client
        .session()
        .login(EMAIL, PASSWORD)
        .await
        .expect("login should succeed");
    let calls_before = backend.total_calls();

    let err = client
        .session()
        .login(EMAIL, PASSWORD)
        .await
        .expect_err("second login must be refused");
    assert_eq!(
        err,
        CoreError::Capability(CapabilityError::AlreadyAuthenticated)
    );
    assert_eq!(backend.total_calls(), calls_before);
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn overlapping_sign_in_is_refused() {
    let (client, backend) = client_with_account();
    let gate = backend.hold(RemoteOp::CreateSession);
    let session = client.session();

    let (first, second, _) = tokio::join!(
        session.login(EMAIL, PASSWORD),
        session.login(EMAIL, PASSWORD),
        async {
            tokio::task::yield_now().await;
            gate.open();
        }
    );

    first.expect("first login should succeed");
    assert_eq!(
        second.expect_err("overlapping login must fail"),
        CoreError::Capability(CapabilityError::AuthInProgress)
    );
    assert_eq!(backend.calls(RemoteOp::CreateSession), 1);
}

#[tokio::test]
async fn logout_resets_locally_even_when_remote_fails() {
    let (client, backend) = client_with_account();
    client
        .session()
        .login(EMAIL, PASSWORD)
        .await
        .expect("login should succeed");
    backend.fail_next(RemoteOp::DeleteSession, RemoteError::network("offline"));

    let err = client
        .session()
        .logout()
        .await
        .expect_err("remote failure is reported");
    assert!(matches!(err, CoreError::Transient(_)));
    assert_eq!(client.session().state(), SessionState::Unauthenticated);
    assert_eq!(client.route(Route::Notes), Route::Auth);
}

#[tokio::test]
async fn logout_of_expired_remote_session_succeeds() {
    let (client, backend) = client_with_account();
    client
        .session()
        .login(EMAIL, PASSWORD)
        .await
        .expect("login should succeed");
    backend.expire_session();

    client
        .session()
        .logout()
        .await
        .expect("already-ended remote session counts as logged out");
    assert_eq!(client.session().state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn invalidate_only_resets_authenticated_sessions() {
    let (client, _backend) = client_with_account();
    assert!(!client.session().invalidate("expired"));

    client
        .session()
        .login(EMAIL, PASSWORD)
        .await
        .expect("login should succeed");
    let seen = record_labels(&client);
    assert!(client.session().invalidate("expired"));
    assert!(!client.session().invalidate("expired"));
    assert_eq!(*seen.lock(), vec!["authenticated", "unauthenticated"]);
}

#[tokio::test]
async fn invalidate_for_a_previous_identity_keeps_the_current_session() {
    let (client, backend) = client_with_account();
    let ada = client
        .session()
        .login(EMAIL, PASSWORD)
        .await
        .expect("login should succeed");
    client.session().logout().await.expect("logout should succeed");
    backend.seed_account("grace@example.com", "hopper-1906", "Grace");
    let grace = client
        .session()
        .login("grace@example.com", "hopper-1906")
        .await
        .expect("second login should succeed");

    assert!(!client.session().invalidate_for(&ada.id, "expired"));
    assert_eq!(client.session().identity(), Some(grace.clone()));
    assert!(client.session().invalidate_for(&grace.id, "expired"));
    assert_eq!(client.session().state(), SessionState::Unauthenticated);
}
