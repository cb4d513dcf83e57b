//! Notes synchronization layer.
//!
//! # Responsibility
//! - `list`: ordered, identifier-unique local note list and the published view.
//! - `synchronizer`: remote-confirmed CRUD scoped to the signed-in owner.
//!
//! # See also
//! - `crate::session` for the lifecycle that drives teardown.

pub mod list;
pub mod synchronizer;
