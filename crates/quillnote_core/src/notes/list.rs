//! Ordered local note list and its published view.
//!
//! # Invariants
//! - Identifiers are unique within a `NoteList`.
//! - Every note in a list built by `from_remote` belongs to the given owner.
//! - Mutations address notes by identifier, never by position, so they stay
//!   correct when a concurrent fetch reshaped the list.

use crate::model::identity::IdentityId;
use crate::model::note::{Note, NoteId};
use std::collections::HashSet;

/// Ordered sequence of notes with unique identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteList {
    notes: Vec<Note>,
}

impl NoteList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list in remote order, keeping only notes of `owner_id`.
    ///
    /// Duplicate identifiers keep their first occurrence.
    pub fn from_remote(notes: Vec<Note>, owner_id: &IdentityId) -> Self {
        let mut seen = HashSet::new();
        let notes = notes
            .into_iter()
            .filter(|note| &note.owner_id == owner_id)
            .filter(|note| seen.insert(note.id.clone()))
            .collect();
        Self { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn as_slice(&self) -> &[Note] {
        &self.notes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn get(&self, note_id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == note_id)
    }

    pub fn position(&self, note_id: &NoteId) -> Option<usize> {
        self.notes.iter().position(|note| &note.id == note_id)
    }

    pub fn contains(&self, note_id: &NoteId) -> bool {
        self.position(note_id).is_some()
    }

    /// Inserts `note` at the head; an existing entry with the same id is
    /// moved rather than duplicated.
    pub fn prepend(&mut self, note: Note) {
        self.notes.retain(|existing| existing.id != note.id);
        self.notes.insert(0, note);
    }

    /// Replaces the entry with the same id in place.
    ///
    /// Returns `false` when the id is no longer listed; nothing is inserted.
    pub fn replace(&mut self, note: Note) -> bool {
        match self.position(&note.id) {
            Some(index) => {
                self.notes[index] = note;
                true
            }
            None => false,
        }
    }

    /// Removes the entry with `note_id`, if present.
    pub fn remove(&mut self, note_id: &NoteId) -> Option<Note> {
        let index = self.position(note_id)?;
        Some(self.notes.remove(index))
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn to_vec(&self) -> Vec<Note> {
        self.notes.clone()
    }
}

/// Snapshot published to notes observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotesView {
    pub notes: NoteList,
    /// A full fetch is in flight.
    pub loading: bool,
    /// User-facing message of the last failed fetch, cleared on success.
    pub last_error: Option<String>,
}
