//! Storage abstractions for service layer
//!
//! Contains the lock-guarded JSON document used by every file-backed store
//! and the advisory lock it is built on.

pub mod file_lock;
pub mod json_document;
