//! In-process backend implementing both remote contracts.
//!
//! # Responsibility
//! - Provide a deterministic stand-in for the hosted identity/document
//!   service, used by tests and the CLI smoke flow.
//! - Expose call counters, one-shot failure injection and call gates so
//!   callers can observe network traffic and hold requests in flight.
//!
//! # Invariants
//! - Only one remote session exists at a time, as with a single device.
//! - Documents are listed newest-created first; updates keep list position.
//! - Document calls require an active session owned by the addressed user.

use crate::model::identity::{Identity, IdentityId, SessionToken};
use crate::model::note::{Note, NoteDraft, NoteId};
use crate::remote::{DocumentApi, IdentityApi, RemoteError, RemoteResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Remote operation names used for counters, failures and gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RemoteOp {
    CreateAccount,
    CreateSession,
    CurrentIdentity,
    DeleteSession,
    ListDocuments,
    CreateDocument,
    UpdateDocument,
    DeleteDocument,
}

/// Handle holding every call of one operation until permits are released.
#[derive(Clone)]
pub struct CallGate {
    permits: Arc<Semaphore>,
}

impl CallGate {
    /// Lets `count` held calls proceed.
    pub fn release(&self, count: usize) {
        self.permits.add_permits(count);
    }

    /// Lets every current and future call through.
    pub fn open(&self) {
        self.permits.close();
    }
}

struct Account {
    identity: Identity,
    password: String,
}

struct StoredNote {
    seq: u64,
    note: Note,
}

#[derive(Default)]
struct BackendState {
    accounts: BTreeMap<String, Account>,
    session: Option<SessionToken>,
    notes: HashMap<NoteId, StoredNote>,
    next_seq: u64,
}

#[derive(Default)]
struct Instrumentation {
    calls: BTreeMap<RemoteOp, usize>,
    failures: HashMap<RemoteOp, VecDeque<RemoteError>>,
    gates: HashMap<RemoteOp, CallGate>,
}

/// Deterministic in-memory backend.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    instrumentation: Mutex<Instrumentation>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account directly, bypassing the identity API counters.
    pub fn seed_account(&self, email: &str, password: &str, name: &str) -> Identity {
        let mut state = self.state.lock();
        insert_account(&mut state, email, password, name)
    }

    /// Stores a note directly for `owner_id`, bypassing the document API.
    pub fn seed_note(&self, owner_id: &IdentityId, title: &str, content: &str) -> Note {
        let mut state = self.state.lock();
        insert_note(&mut state, owner_id, title, content)
    }

    /// Drops the current remote session, as an expiry would.
    pub fn expire_session(&self) {
        self.state.lock().session = None;
    }

    pub fn has_session(&self) -> bool {
        self.state.lock().session.is_some()
    }

    /// Returns the stored notes of one owner in list order.
    pub fn documents_of(&self, owner_id: &IdentityId) -> Vec<Note> {
        list_for_owner(&self.state.lock(), owner_id)
    }

    /// Number of calls issued to `op` so far.
    pub fn calls(&self, op: RemoteOp) -> usize {
        self.instrumentation
            .lock()
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Number of calls issued across all operations.
    pub fn total_calls(&self) -> usize {
        self.instrumentation.lock().calls.values().sum()
    }

    /// Makes the next call to `op` fail with `error`.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.instrumentation
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Holds every subsequent call to `op` until the returned gate releases it.
    pub fn hold(&self, op: RemoteOp) -> CallGate {
        let gate = CallGate {
            permits: Arc::new(Semaphore::new(0)),
        };
        self.instrumentation.lock().gates.insert(op, gate.clone());
        gate
    }

    async fn enter(&self, op: RemoteOp) -> RemoteResult<()> {
        let gate = {
            let mut instrumentation = self.instrumentation.lock();
            *instrumentation.calls.entry(op).or_insert(0) += 1;
            instrumentation.gates.get(&op).cloned()
        };

        if let Some(gate) = gate {
            // A closed semaphore means the gate was opened for good.
            if let Ok(permit) = gate.permits.acquire().await {
                permit.forget();
            }
        }

        let failure = self
            .instrumentation
            .lock()
            .failures
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityApi for InMemoryBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Identity> {
        self.enter(RemoteOp::CreateAccount).await?;
        let mut state = self.state.lock();
        if state.accounts.contains_key(&email.to_lowercase()) {
            return Err(RemoteError::rejected(
                "A user with the same id, email, or phone already exists in this project.",
            ));
        }
        Ok(insert_account(&mut state, email, password, name))
    }

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<SessionToken> {
        self.enter(RemoteOp::CreateSession).await?;
        let mut state = self.state.lock();
        if state.session.is_some() {
            return Err(RemoteError::unauthorized(
                "Creation of a session is prohibited when a session is active.",
            ));
        }
        let user_id = match state.accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => account.identity.id.clone(),
            _ => {
                return Err(RemoteError::unauthorized(
                    "Invalid credentials. Please check the email and password.",
                ))
            }
        };
        let token = SessionToken {
            id: new_remote_id(),
            user_id,
        };
        state.session = Some(token.clone());
        Ok(token)
    }

    async fn current_identity(&self) -> RemoteResult<Identity> {
        self.enter(RemoteOp::CurrentIdentity).await?;
        let state = self.state.lock();
        let user_id = session_user(&state)?;
        state
            .accounts
            .values()
            .find(|account| &account.identity.id == user_id)
            .map(|account| account.identity.clone())
            .ok_or_else(|| RemoteError::unauthorized("session user no longer exists"))
    }

    async fn delete_session(&self) -> RemoteResult<()> {
        self.enter(RemoteOp::DeleteSession).await?;
        let mut state = self.state.lock();
        session_user(&state)?;
        state.session = None;
        Ok(())
    }
}

#[async_trait]
impl DocumentApi for InMemoryBackend {
    async fn list_documents(&self, owner_id: &IdentityId) -> RemoteResult<Vec<Note>> {
        self.enter(RemoteOp::ListDocuments).await?;
        let state = self.state.lock();
        if session_user(&state)? != owner_id {
            return Err(RemoteError::unauthorized(
                "The current user is not authorized to perform the requested action.",
            ));
        }
        Ok(list_for_owner(&state, owner_id))
    }

    async fn create_document(
        &self,
        owner_id: &IdentityId,
        draft: &NoteDraft,
    ) -> RemoteResult<Note> {
        self.enter(RemoteOp::CreateDocument).await?;
        let mut state = self.state.lock();
        if session_user(&state)? != owner_id {
            return Err(RemoteError::unauthorized(
                "The current user is not authorized to perform the requested action.",
            ));
        }
        Ok(insert_note(&mut state, owner_id, draft.title(), draft.content()))
    }

    async fn update_document(&self, note_id: &NoteId, draft: &NoteDraft) -> RemoteResult<Note> {
        self.enter(RemoteOp::UpdateDocument).await?;
        let mut state = self.state.lock();
        let user_id = session_user(&state)?.clone();
        match state.notes.get_mut(note_id) {
            Some(stored) if stored.note.owner_id == user_id => {
                stored.note.title = draft.title().to_string();
                stored.note.content = draft.content().to_string();
                stored.note.updated_at = Utc::now();
                Ok(stored.note.clone())
            }
            _ => Err(document_not_found()),
        }
    }

    async fn delete_document(&self, note_id: &NoteId) -> RemoteResult<()> {
        self.enter(RemoteOp::DeleteDocument).await?;
        let mut state = self.state.lock();
        let user_id = session_user(&state)?.clone();
        let owned = state
            .notes
            .get(note_id)
            .is_some_and(|stored| stored.note.owner_id == user_id);
        if !owned {
            return Err(document_not_found());
        }
        state.notes.remove(note_id);
        Ok(())
    }
}

fn new_remote_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn document_not_found() -> RemoteError {
    RemoteError::not_found("Document with the requested ID could not be found.")
}

fn session_user(state: &BackendState) -> RemoteResult<&IdentityId> {
    state
        .session
        .as_ref()
        .map(|session| &session.user_id)
        .ok_or_else(|| RemoteError::unauthorized("User (role: guests) missing scope (account)"))
}

fn insert_account(state: &mut BackendState, email: &str, password: &str, name: &str) -> Identity {
    let identity = Identity::new(IdentityId::new(new_remote_id()), name, email);
    state.accounts.insert(
        email.to_lowercase(),
        Account {
            identity: identity.clone(),
            password: password.to_string(),
        },
    );
    identity
}

fn insert_note(state: &mut BackendState, owner_id: &IdentityId, title: &str, content: &str) -> Note {
    let now = Utc::now();
    let note = Note {
        id: NoteId::new(new_remote_id()),
        owner_id: owner_id.clone(),
        title: title.to_string(),
        content: content.to_string(),
        created_at: now,
        updated_at: now,
    };
    state.next_seq += 1;
    state.notes.insert(
        note.id.clone(),
        StoredNote {
            seq: state.next_seq,
            note: note.clone(),
        },
    );
    note
}

fn list_for_owner(state: &BackendState, owner_id: &IdentityId) -> Vec<Note> {
    let mut owned = state
        .notes
        .values()
        .filter(|stored| &stored.note.owner_id == owner_id)
        .collect::<Vec<_>>();
    owned.sort_by(|left, right| right.seq.cmp(&left.seq));
    owned.into_iter().map(|stored| stored.note.clone()).collect()
}
