//! Client facade wiring the session manager to the notes synchronizer.
//!
//! # Responsibility
//! - Build one session manager and one synchronizer over a backend.
//! - Expose routing decisions for UI surfaces.
//!
//! # Lifecycle
//! Created once per process by the embedding surface. `shutdown` (or drop)
//! detaches the synchronizer from the session.

use crate::config::RemoteConfig;
use crate::error::CoreResult;
use crate::notes::synchronizer::NotesSynchronizer;
use crate::remote::appwrite::AppwriteClient;
use crate::remote::memory::InMemoryBackend;
use crate::remote::{DocumentApi, IdentityApi};
use crate::route::{resolve_route, Route};
use crate::session::manager::SessionManager;
use log::info;
use std::sync::Arc;

/// Session plus notes, sharing one backend.
pub struct QuillClient {
    session: Arc<SessionManager>,
    notes: NotesSynchronizer,
}

impl QuillClient {
    pub fn new(identity_api: Arc<dyn IdentityApi>, documents: Arc<dyn DocumentApi>) -> Self {
        let session = Arc::new(SessionManager::new(identity_api));
        let notes = NotesSynchronizer::new(session.clone(), documents);
        Self { session, notes }
    }

    /// Uses one object for both the identity and document contracts.
    pub fn with_backend<B>(backend: Arc<B>) -> Self
    where
        B: IdentityApi + DocumentApi + 'static,
    {
        let identity_api: Arc<dyn IdentityApi> = backend.clone();
        let documents: Arc<dyn DocumentApi> = backend;
        Self::new(identity_api, documents)
    }

    /// Connects to the hosted service described by `config`.
    pub fn from_config(config: RemoteConfig) -> CoreResult<Self> {
        info!(
            "event=client_init module=client status=ok backend=appwrite endpoint={}",
            config.endpoint
        );
        let backend = Arc::new(AppwriteClient::new(config)?);
        Ok(Self::with_backend(backend))
    }

    /// Runs against a fresh in-memory backend; returns the backend too so
    /// callers can seed accounts and notes.
    pub fn in_memory() -> (Self, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        info!("event=client_init module=client status=ok backend=memory");
        (Self::with_backend(backend.clone()), backend)
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn notes(&self) -> &NotesSynchronizer {
        &self.notes
    }

    /// Screen to show for `requested` given the current session.
    pub fn route(&self, requested: Route) -> Route {
        resolve_route(
            &self.session.state(),
            self.session.restore_complete(),
            requested,
        )
    }

    /// Detaches every UI observer and the synchronizer from the session.
    pub fn shutdown(self) {
        self.notes.clear_subscribers();
        let Self { session, notes } = self;
        drop(notes);
        session.clear_subscribers();
        info!("event=client_shutdown module=client status=ok");
    }

    /// Launch sequence: restore the session, then load notes when signed in.
    ///
    /// Fetch failures are kept in the notes view; the route is returned
    /// regardless.
    pub async fn start(&self) -> Route {
        if self.session.restore().await.is_some() {
            let _ = self.notes.fetch_all().await;
        }
        self.route(Route::Home)
    }
}

#[cfg(test)]
mod tests {
    use super::QuillClient;
    use crate::route::Route;

    #[tokio::test]
    async fn start_without_session_routes_to_auth() {
        let (client, _backend) = QuillClient::in_memory();
        assert_eq!(client.route(Route::Home), Route::Loading);
        assert_eq!(client.start().await, Route::Auth);
    }

    #[tokio::test]
    async fn start_with_session_loads_notes() {
        let (client, backend) = QuillClient::in_memory();
        let identity = backend.seed_account("ada@example.com", "correct-horse", "Ada");
        backend.seed_note(&identity.id, "hello", "world");
        client
            .session()
            .login("ada@example.com", "correct-horse")
            .await
            .expect("login should succeed");

        let relaunched = QuillClient::with_backend(backend.clone());
        assert_eq!(relaunched.start().await, Route::Home);
        assert_eq!(relaunched.notes().notes().len(), 1);
    }

    #[test]
    fn shutdown_detaches_all_session_observers() {
        let (client, _backend) = QuillClient::in_memory();
        let session = client.session().clone();
        session.subscribe(|_| {});
        assert_eq!(session.subscriber_count(), 2);
        client.shutdown();
        assert_eq!(session.subscriber_count(), 0);
    }
}
