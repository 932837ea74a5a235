//! Backend-neutral storage errors.

use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by row store backends regardless of the hosted database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or answered with a transport failure.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered but refused the query or update.
    #[error("storage rejected request on `{table}`: {message}")]
    Rejected {
        /// Table the request targeted.
        table: String,
        /// Backend explanation.
        message: String,
    },
    /// A change subscription ended and must be re-established.
    #[error("subscription to `{table}` row {id} closed")]
    SubscriptionClosed {
        /// Subscribed table.
        table: String,
        /// Subscribed row id.
        id: i64,
    },
    /// The configured backend was not compiled into this build.
    #[error("row store backend `{0}` is not available in this build")]
    Unsupported(&'static str),
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a rejection for the given table.
    pub fn rejected(table: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::Rejected {
            table: table.into(),
            message: message.into(),
        }
    }
}
