//! Unified error types for shelf.
//!
//! Only `Provision` is fatal. Network, store-write and store-delete failures
//! are absorbed by the engine and turned into a best-effort response.

use tokio_rusqlite::rusqlite;

/// Unified error types for the shelf cache layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Namespace name or version does not follow `<app>-v<version>`.
    #[error("INVALID_NAMESPACE: {0}")]
    InvalidNamespace(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A core asset could not be fetched or stored during startup.
    #[error("PROVISION_FAILED: {path}: {reason}")]
    Provision { path: String, reason: String },

    /// The fetcher could not produce a response.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// A response could not be persisted.
    #[error("STORE_WRITE_FAILED: {0}")]
    StoreWrite(String),

    /// A stale namespace could not be deleted.
    #[error("STORE_DELETE_FAILED: {namespace}: {reason}")]
    StoreDelete { namespace: String, reason: String },
}

impl Error {
    /// Whether the engine should absorb this error rather than surface it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::StoreWrite(_) | Error::StoreDelete { .. })
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
