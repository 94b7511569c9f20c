//! Error types shared across the crate.
//!
//! Errors are grouped by where they originate: configuration that is read
//! before any I/O happens, the storage backends, and the process lifecycle
//! that ties the two together. Data-source failures are deliberately absent:
//! the client turns them into `None` (see [`crate::source::DataSource`]).

use std::io;

use thiserror::Error;

/// Required configuration is missing or malformed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid settings document {path}: {message}")]
    Settings { path: String, message: String },

    #[error("no stored token at {0}, run `spotlake auth` first")]
    MissingToken(String),

    #[error("invalid server address '{0}'")]
    InvalidServerAddress(String),
}

/// Failure of a storage operation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The location does not exist. Only `load` reports this.
    #[error("location not found: {location}")]
    NotFound { location: String },

    #[error("i/o error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },

    /// `delete` found a child directory that still has content. Nothing
    /// was removed.
    #[error("directory not empty: {location}")]
    DirectoryNotEmpty { location: String },

    /// The remote object store rejected or failed the request.
    #[error("object store error at {location}: {message}")]
    Backend { location: String, message: String },

    #[error("unsupported storage root '{0}'")]
    UnsupportedRoot(String),
}

impl StorageError {
    pub(crate) fn io(location: impl ToString, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound {
                location: location.to_string(),
            }
        } else {
            StorageError::Io {
                location: location.to_string(),
                source,
            }
        }
    }

    pub(crate) fn backend(location: impl ToString, message: impl ToString) -> Self {
        StorageError::Backend {
            location: location.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Failure while constructing, running or cleaning a process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("process '{0}' has already been run")]
    AlreadyRan(String),
}
