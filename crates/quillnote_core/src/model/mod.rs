//! Client-side domain model for identities, sessions and notes.
//!
//! # Responsibility
//! - Define the value types shared by session, notes and remote layers.
//! - Keep field validation next to the types it protects.
//!
//! # Invariants
//! - Note identifiers are assigned by the remote store, never by the client.
//! - Every `Note` carries the owner reference of the identity that created it.

pub mod identity;
pub mod note;
pub mod session;
