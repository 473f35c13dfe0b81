use std::path::PathBuf;

use thiserror::Error;

use crate::roster::domain::Rejection;
use crate::storage::file_lock::LockMode;

/// Failures of the file-backed record store.
///
/// Expected outcomes (duplicate, wrong password, missing student) are never
/// reported here; they come back as values from the store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not acquire {mode} lock on {} after {attempts} attempts", .path.display())]
    LockTimeout {
        path: PathBuf,
        mode: LockMode,
        attempts: u32,
    },
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode store state: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("persisted state at {} is unreadable: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("blocking store task failed: {0}")]
    Join(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Lock exhaustion is transient: the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unknown class: {0}")]
    InvalidClass(String),
    #[error("student is already registered")]
    AlreadyRegistered,
    #[error("request rejected: {0}")]
    Rejected(Rejection),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn missing_data() -> Self {
        Self::Validation("student name and class are required".into())
    }
}
