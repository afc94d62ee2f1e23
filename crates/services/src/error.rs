use std::fmt;

use thiserror::Error;

use crate::auth::AuthError;
use crate::codec::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    File,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Folder => f.write_str("folder"),
            EntryKind::File => f.write_str("file"),
        }
    }
}

/// Failure reported by the Drive listing or content API.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{operation} returned status {status}: {message}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Connection failures, rate limiting and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Transport(e) => !e.is_builder() && !e.is_decode(),
            BackendError::Status { status, .. } => *status == 429 || *status >= 500,
            BackendError::Malformed(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No {kind} named '{name}'")]
    NotFound { kind: EntryKind, name: String },
    #[error("{count} files named '{name}'")]
    Ambiguous { name: String, count: usize },
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Parse error: {0}")]
    Parse(#[source] CodecError),
    #[error("Deserialization error: {0}")]
    Deserialization(#[source] CodecError),
    #[error("Serialization error: {0}")]
    Serialization(#[source] CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn folder_not_found(name: &str) -> Self {
        StorageError::NotFound {
            kind: EntryKind::Folder,
            name: name.to_string(),
        }
    }

    pub fn file_not_found(name: &str) -> Self {
        StorageError::NotFound {
            kind: EntryKind::File,
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Backend(e) if e.is_transient())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
