//! Flutter bridge crate for QuillNote core.

pub mod api;
