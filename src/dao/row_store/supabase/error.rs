//! Error types shared by the hosted store implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`SupabaseError`] failures.
pub type SupabaseResult<T> = Result<T, SupabaseError>;

/// Failures that can occur while talking to the hosted database.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// Required environment variable is missing.
    #[error("missing Supabase environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed.
    #[error("failed to build Supabase HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A REST request could not be sent.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// PostgREST returned a non-success status.
    #[error("unexpected response status {status} for `{path}`: {body}")]
    RequestStatus {
        path: String,
        status: StatusCode,
        body: String,
    },
    /// Response payload could not be decoded.
    #[error("failed to decode response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The realtime websocket could not be opened or broke.
    #[error("realtime socket failure")]
    Realtime {
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    /// The realtime server refused the channel join.
    #[error("realtime join for `{topic}` rejected: {reason}")]
    JoinRejected { topic: String, reason: String },
}

impl From<SupabaseError> for StorageError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::RequestStatus { path, status, body } if status.is_client_error() => {
                StorageError::rejected(path, format!("{status}: {body}"))
            }
            SupabaseError::JoinRejected { topic, reason } => StorageError::rejected(topic, reason),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
