//! Authentication session lifecycle.
//!
//! # Responsibility
//! - Own the process-wide `SessionState` and publish every transition.
//! - Run restore/login/register/logout against the identity service.
//!
//! # Invariants
//! - Network-backed sign-in always passes through `Authenticating`.
//! - A failed sign-in publishes `Error(reason)` and then `Unauthenticated`.
//! - `Authenticated` is left only through `logout` or `invalidate`.
//! - At most one sign-in/restore/logout runs at a time.

use crate::error::{CapabilityError, CoreError, CoreResult};
use crate::model::identity::{Identity, IdentityId};
use crate::model::session::SessionState;
use crate::observe::{Observable, SubscriptionId};
use crate::remote::{IdentityApi, RemoteError, RemoteErrorKind};
use crate::session::validation::{redact_email, validate_login, validate_registration};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};

/// Single source of truth for "who is logged in".
pub struct SessionManager {
    identity_api: Arc<dyn IdentityApi>,
    state: Observable<SessionState>,
    auth_lock: Mutex<()>,
    restore_complete: AtomicBool,
}

impl SessionManager {
    /// Creates a manager in `Unauthenticated` state.
    pub fn new(identity_api: Arc<dyn IdentityApi>) -> Self {
        Self {
            identity_api,
            state: Observable::new(SessionState::Unauthenticated),
            auth_lock: Mutex::new(()),
            restore_complete: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.with(|state| state.identity().cloned())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.with(SessionState::is_authenticated)
    }

    /// Whether the launch-time `restore` has settled.
    pub fn restore_complete(&self) -> bool {
        self.restore_complete.load(Ordering::Acquire)
    }

    /// Subscribes to session transitions; the current state is delivered first.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&SessionState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.state.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.subscriber_count()
    }

    /// Detaches every observer; used when the owning client shuts down.
    pub fn clear_subscribers(&self) {
        self.state.clear_subscribers();
    }

    /// Looks up an existing remote session at launch.
    ///
    /// Never fails: any error, including network failure, settles the session
    /// to `Unauthenticated`.
    pub async fn restore(&self) -> Option<Identity> {
        let _guard = self.auth_lock.lock().await;
        if let Some(identity) = self.identity() {
            self.restore_complete.store(true, Ordering::Release);
            return Some(identity);
        }

        let started_at = Instant::now();
        info!("event=session_restore module=session status=start");
        self.state.set(SessionState::Authenticating);

        let result = self.identity_api.current_identity().await;
        self.restore_complete.store(true, Ordering::Release);
        match result {
            Ok(identity) => {
                info!(
                    "event=session_restore module=session status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.state
                    .set(SessionState::Authenticated(identity.clone()));
                Some(identity)
            }
            Err(err) => {
                info!(
                    "event=session_restore module=session status=none duration_ms={} reason={}",
                    started_at.elapsed().as_millis(),
                    err.kind.as_str()
                );
                self.state.set(SessionState::Unauthenticated);
                None
            }
        }
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    /// - `Validation` for malformed input (no network call) or rejected
    ///   credentials.
    /// - `Capability` when already signed in or another sign-in is running.
    /// - `Transient` on connectivity failure.
    pub async fn login(&self, email: &str, password: &str) -> CoreResult<Identity> {
        validate_login(email, password)?;
        let _guard = self.begin_sign_in()?;

        let started_at = Instant::now();
        info!(
            "event=auth_login module=session status=start email={}",
            redact_email(email)
        );
        self.state.set(SessionState::Authenticating);
        let result = self.authenticate(email, password).await;
        self.settle("auth_login", started_at, result)
    }

    /// Creates an account and signs in with the same credentials.
    ///
    /// # Errors
    /// Same as `login`; a duplicate account surfaces as
    /// `ValidationError::Rejected` with the service message.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> CoreResult<Identity> {
        validate_registration(email, password, name)?;
        let _guard = self.begin_sign_in()?;

        let started_at = Instant::now();
        info!(
            "event=auth_register module=session status=start email={}",
            redact_email(email)
        );
        self.state.set(SessionState::Authenticating);
        let result = match self
            .identity_api
            .create_account(email, password, name.trim())
            .await
        {
            Ok(_) => self.authenticate(email, password).await,
            Err(err) => Err(CoreError::from(err)),
        };
        self.settle("auth_register", started_at, result)
    }

    /// Ends the remote session and always resets local state.
    ///
    /// The returned error only reports the remote outcome; the session is
    /// `Unauthenticated` either way. A remote session that is already gone
    /// counts as success.
    pub async fn logout(&self) -> CoreResult<()> {
        let _guard = self.auth_lock.lock().await;
        let started_at = Instant::now();
        info!("event=auth_logout module=session status=start");

        let remote = self.identity_api.delete_session().await;
        self.state.set(SessionState::Unauthenticated);

        match remote {
            Ok(()) => {
                info!(
                    "event=auth_logout module=session status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err)
                if matches!(
                    err.kind,
                    RemoteErrorKind::Unauthorized | RemoteErrorKind::NotFound
                ) =>
            {
                info!(
                    "event=auth_logout module=session status=ok duration_ms={} remote=already_ended",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=auth_logout module=session status=error duration_ms={} error_code={} local_reset=true",
                    started_at.elapsed().as_millis(),
                    err.kind.as_str()
                );
                Err(err.into())
            }
        }
    }

    /// Handles a remote report that the session is no longer valid.
    ///
    /// Returns `true` when an authenticated session was reset.
    pub fn invalidate(&self, reason: &str) -> bool {
        self.reset_if(reason, |state| state.is_authenticated())
    }

    /// Like `invalidate`, but only while `owner` is the signed-in identity.
    ///
    /// The check and the reset happen under one state write, so a report
    /// about an earlier session cannot end a session opened after it.
    pub fn invalidate_for(&self, owner: &IdentityId, reason: &str) -> bool {
        self.reset_if(reason, |state| state.owner_id() == Some(owner))
    }

    fn reset_if(&self, reason: &str, applies: impl FnOnce(&SessionState) -> bool) -> bool {
        let reset = self.state.update_if(|state| {
            if applies(state) {
                *state = SessionState::Unauthenticated;
                true
            } else {
                false
            }
        });
        if reset {
            warn!(
                "event=session_invalidated module=session status=reset reason={}",
                reason
            );
        }
        reset
    }

    fn begin_sign_in(&self) -> CoreResult<MutexGuard<'_, ()>> {
        let guard = self
            .auth_lock
            .try_lock()
            .map_err(|_| CapabilityError::AuthInProgress)?;
        if self.is_authenticated() {
            return Err(CapabilityError::AlreadyAuthenticated.into());
        }
        Ok(guard)
    }

    async fn authenticate(&self, email: &str, password: &str) -> CoreResult<Identity> {
        self.identity_api
            .create_session(email, password)
            .await
            .map_err(credential_error)?;

        match self.identity_api.current_identity().await {
            Ok(identity) => Ok(identity),
            Err(err) => {
                // Do not leave a remote session behind a failed local sign-in.
                if let Err(cleanup) = self.identity_api.delete_session().await {
                    warn!(
                        "event=auth_cleanup module=session status=error error_code={}",
                        cleanup.kind.as_str()
                    );
                }
                Err(err.into())
            }
        }
    }

    fn settle(
        &self,
        event: &'static str,
        started_at: Instant,
        result: CoreResult<Identity>,
    ) -> CoreResult<Identity> {
        match result {
            Ok(identity) => {
                info!(
                    "event={} module=session status=ok duration_ms={}",
                    event,
                    started_at.elapsed().as_millis()
                );
                self.state
                    .set(SessionState::Authenticated(identity.clone()));
                Ok(identity)
            }
            Err(err) => {
                warn!(
                    "event={} module=session status=error duration_ms={} error_code={}",
                    event,
                    started_at.elapsed().as_millis(),
                    err.code()
                );
                self.state.set(SessionState::Error(err.user_message()));
                self.state.set(SessionState::Unauthenticated);
                Err(err)
            }
        }
    }
}

/// Wrong credentials come back as an authorization failure; for a sign-in
/// form they are a rejected input, not an expired session.
fn credential_error(err: RemoteError) -> CoreError {
    match err.kind {
        RemoteErrorKind::Unauthorized => CoreError::from(RemoteError::rejected(err.message)),
        _ => CoreError::from(err),
    }
}
