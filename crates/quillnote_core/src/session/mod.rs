//! Authentication session layer.
//!
//! # Responsibility
//! - Validate credentials locally before any network call.
//! - Drive the session state machine and publish its transitions.
//!
//! # See also
//! - `crate::notes`, which tears its state down when the session ends.

pub mod manager;
pub mod validation;
