//! Notes list reconciliation against the remote document store.
//!
//! # Responsibility
//! - Keep the local `NoteList` consistent with remote confirmations.
//! - Scope every request to the currently authenticated owner.
//! - Tear local state down whenever the session leaves `Authenticated` or the
//!   identity changes.
//!
//! # Invariants
//! - Local state changes only after the remote call resolves; failures leave
//!   the published list untouched.
//! - Results produced under an older session generation are discarded.
//! - At most one `list_documents` request is in flight per generation.
//! - An authorization failure resets the session after the local lock is
//!   released.
//! - Notes observers run while the scope lock is held; they may read `notes`
//!   or `view` but must not call `is_active` or start operations inline.

use crate::error::{CapabilityError, CoreError, CoreResult};
use crate::model::identity::IdentityId;
use crate::model::note::{Note, NoteDraft, NoteId};
use crate::model::session::SessionState;
use crate::notes::list::{NoteList, NotesView};
use crate::observe::{Observable, SubscriptionId};
use crate::remote::{DocumentApi, RemoteErrorKind, RemoteResult};
use crate::session::manager::SessionManager;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Instant;

type SharedFetch = Shared<BoxFuture<'static, CoreResult<Vec<Note>>>>;

#[derive(Default)]
struct Scope {
    owner: Option<IdentityId>,
    generation: u64,
    fetch: Option<SharedFetch>,
}

struct SyncInner {
    session: Arc<SessionManager>,
    documents: Arc<dyn DocumentApi>,
    view: Observable<NotesView>,
    scope: Mutex<Scope>,
}

/// Owner of the in-memory notes list for the signed-in user.
pub struct NotesSynchronizer {
    inner: Arc<SyncInner>,
    session_subscription: SubscriptionId,
}

impl NotesSynchronizer {
    /// Creates a synchronizer bound to `session`.
    ///
    /// The current session state is applied immediately, so a synchronizer
    /// created after sign-in is active right away.
    pub fn new(session: Arc<SessionManager>, documents: Arc<dyn DocumentApi>) -> Self {
        let inner = Arc::new(SyncInner {
            session: session.clone(),
            documents,
            view: Observable::new(NotesView::default()),
            scope: Mutex::new(Scope::default()),
        });
        let weak: Weak<SyncInner> = Arc::downgrade(&inner);
        let session_subscription = session.subscribe(move |state| {
            if let Some(inner) = weak.upgrade() {
                inner.on_session_change(state);
            }
        });
        Self {
            inner,
            session_subscription,
        }
    }

    /// Whether an owner is bound and operations are allowed.
    pub fn is_active(&self) -> bool {
        self.inner.scope.lock().owner.is_some()
    }

    /// Current list in display order.
    pub fn notes(&self) -> Vec<Note> {
        self.inner.view.with(|view| view.notes.to_vec())
    }

    pub fn view(&self) -> NotesView {
        self.inner.view.get()
    }

    /// Subscribes to list changes; the current view is delivered first.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&NotesView) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.view.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.view.unsubscribe(id)
    }

    pub fn clear_subscribers(&self) {
        self.inner.view.clear_subscribers();
    }

    /// Replaces the local list with the remote list of the current owner.
    ///
    /// Calls made while a fetch is in flight wait for that fetch instead of
    /// issuing another request.
    pub async fn fetch_all(&self) -> CoreResult<Vec<Note>> {
        let fetch = {
            let mut scope = self.inner.scope.lock();
            let owner = scope
                .owner
                .clone()
                .ok_or(CapabilityError::NotAuthenticated)?;
            match scope.fetch.as_ref() {
                Some(in_flight) => {
                    debug!("event=notes_fetch module=notes status=coalesced");
                    in_flight.clone()
                }
                None => {
                    let fetch = SyncInner::start_fetch(self.inner.clone(), owner, scope.generation);
                    scope.fetch = Some(fetch.clone());
                    self.inner.view.update(|view| view.loading = true);
                    fetch
                }
            }
        };
        fetch.await
    }

    /// Creates a note and prepends the stored record.
    ///
    /// # Errors
    /// - `Capability` when signed out; `Validation` for blank fields. Neither
    ///   issues a network call.
    pub async fn create(&self, title: &str, content: &str) -> CoreResult<Note> {
        let (owner, generation) = self.inner.begin()?;
        let draft = NoteDraft::new(title, content)?;

        let started_at = Instant::now();
        let result = self.inner.documents.create_document(&owner, &draft).await;
        self.inner
            .complete("notes_create", &owner, generation, started_at, result, |list, note| {
                list.prepend(note.clone());
            })
    }

    /// Replaces title and content of one note, keeping its list position.
    ///
    /// # Errors
    /// - `NotFound` when the note no longer exists remotely; the local entry
    ///   is left as it was.
    pub async fn update(&self, note_id: &NoteId, title: &str, content: &str) -> CoreResult<Note> {
        let (owner, generation) = self.inner.begin()?;
        let draft = NoteDraft::new(title, content)?;

        let started_at = Instant::now();
        let result = self.inner.documents.update_document(note_id, &draft).await;
        self.inner
            .complete("notes_update", &owner, generation, started_at, result, |list, note| {
                list.replace(note.clone());
            })
    }

    /// Deletes one note; local removal follows remote confirmation.
    ///
    /// The remote delete is always issued, even for ids missing from the
    /// local list; a remote `NotFound` counts as already deleted.
    pub async fn delete(&self, note_id: &NoteId) -> CoreResult<()> {
        let (owner, generation) = self.inner.begin()?;
        let started_at = Instant::now();
        let result = match self.inner.documents.delete_document(note_id).await {
            Err(err) if err.kind == RemoteErrorKind::NotFound => Ok(()),
            other => other,
        };
        self.inner
            .complete("notes_delete", &owner, generation, started_at, result, |list, _| {
                list.remove(note_id);
            })
    }
}

impl Drop for NotesSynchronizer {
    fn drop(&mut self) {
        self.inner.session.unsubscribe(self.session_subscription);
    }
}

impl SyncInner {
    fn on_session_change(&self, state: &SessionState) {
        let next_owner = state.owner_id().cloned();
        let mut scope = self.scope.lock();
        if scope.owner == next_owner {
            return;
        }

        let had_owner = scope.owner.is_some();
        scope.owner = next_owner;
        scope.generation += 1;
        scope.fetch = None;
        self.view.set(NotesView::default());
        if had_owner {
            info!(
                "event=notes_teardown module=notes status=ok session={} generation={}",
                state.label(),
                scope.generation
            );
        }
    }

    fn begin(&self) -> CoreResult<(IdentityId, u64)> {
        let scope = self.scope.lock();
        match scope.owner.clone() {
            Some(owner) => Ok((owner, scope.generation)),
            None => Err(CapabilityError::NotAuthenticated.into()),
        }
    }

    fn start_fetch(inner: Arc<Self>, owner: IdentityId, generation: u64) -> SharedFetch {
        async move {
            let started_at = Instant::now();
            let result = inner.documents.list_documents(&owner).await;
            inner.finish_fetch(&owner, generation, started_at, result)
        }
        .boxed()
        .shared()
    }

    fn finish_fetch(
        &self,
        owner: &IdentityId,
        generation: u64,
        started_at: Instant,
        result: RemoteResult<Vec<Note>>,
    ) -> CoreResult<Vec<Note>> {
        let outcome = {
            let mut scope = self.scope.lock();
            if scope.generation != generation {
                Err(CoreError::SessionChanged)
            } else {
                scope.fetch = None;
                match result {
                    Ok(notes) => {
                        let list = NoteList::from_remote(notes, owner);
                        let notes = list.to_vec();
                        self.view.set(NotesView {
                            notes: list,
                            loading: false,
                            last_error: None,
                        });
                        Ok(notes)
                    }
                    Err(err) => {
                        let err = CoreError::from(err);
                        let message = err.action_message("load notes");
                        self.view.update(|view| {
                            view.loading = false;
                            view.last_error = Some(message);
                        });
                        Err(err)
                    }
                }
            }
        };
        self.report("notes_fetch", owner, started_at, &outcome);
        outcome
    }

    fn complete<T>(
        &self,
        event: &'static str,
        owner: &IdentityId,
        generation: u64,
        started_at: Instant,
        result: RemoteResult<T>,
        apply: impl FnOnce(&mut NoteList, &T),
    ) -> CoreResult<T> {
        let outcome = {
            let scope = self.scope.lock();
            if scope.generation != generation {
                Err(CoreError::SessionChanged)
            } else {
                match result {
                    Ok(value) => {
                        self.view.update(|view| apply(&mut view.notes, &value));
                        Ok(value)
                    }
                    Err(err) => Err(CoreError::from(err)),
                }
            }
        };
        self.report(event, owner, started_at, &outcome);
        outcome
    }

    /// Logs the outcome and resets the session on authorization failure.
    ///
    /// The reset only applies while `owner` is still the signed-in identity,
    /// so a failure observed after a logout and re-login cannot end the new
    /// session. Must run without holding the scope lock.
    fn report<T>(
        &self,
        event: &'static str,
        owner: &IdentityId,
        started_at: Instant,
        outcome: &CoreResult<T>,
    ) {
        let duration_ms = started_at.elapsed().as_millis();
        match outcome {
            Ok(_) => info!(
                "event={} module=notes status=ok duration_ms={}",
                event, duration_ms
            ),
            Err(CoreError::SessionChanged) => info!(
                "event={} module=notes status=discarded duration_ms={} reason=session_changed",
                event, duration_ms
            ),
            Err(err) => {
                warn!(
                    "event={} module=notes status=error duration_ms={} error_code={}",
                    event,
                    duration_ms,
                    err.code()
                );
                if let CoreError::Authorization(reason) = err {
                    self.session.invalidate_for(owner, reason);
                }
            }
        }
    }
}
