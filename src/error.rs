//! Error types for the provenance graph store and consistency checker.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    /// True when a create failed only because the key was already present.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::AlreadyExists(_))
    }
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        match err {
            sled::Error::Io(io) => StorageError::IoError(io),
            other => StorageError::Backend(other.to_string()),
        }
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Failure of a consistency check.
///
/// `E` is the sink's own error type. A sink abort is returned as-is in
/// [`FsckError::Aborted`] so callers can tell it apart from a storage failure.
#[derive(Debug, Error)]
pub enum FsckError<E> {
    #[error("fsck failed while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },

    #[error("fsck aborted by sink: {0}")]
    Aborted(E),
}

impl<E> FsckError<E> {
    pub(crate) fn storage(context: impl Into<String>, source: StorageError) -> Self {
        FsckError::Storage {
            context: context.into(),
            source,
        }
    }

    /// The sink's error, if the scan was aborted by the sink.
    pub fn into_aborted(self) -> Option<E> {
        match self {
            FsckError::Aborted(e) => Some(e),
            FsckError::Storage { .. } => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, FsckError::Aborted(_))
    }
}

/// Application-level errors surfaced by the CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Dump error: {0}")]
    DumpError(String),

    #[error("{0}")]
    FsckFailed(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl<E: std::fmt::Display> From<FsckError<E>> for ApiError {
    fn from(err: FsckError<E>) -> Self {
        match err {
            FsckError::Storage { context, source } => {
                ApiError::FsckFailed(format!("fsck failed while {}: {}", context, source))
            }
            FsckError::Aborted(e) => ApiError::FsckFailed(format!("fsck aborted: {}", e)),
        }
    }
}
