//! Error types for the Identifo client.

use thiserror::Error;

/// Result type for Identifo client operations.
pub type Result<T> = std::result::Result<T, ErrorResponse>;

/// Structured failure returned by every Identifo operation.
///
/// Failures are handed back to the caller verbatim; the session manager never
/// retries, backs off, or recovers on its own. The variants matter to callers
/// (show a validation message, offer a retry on network loss), not to the
/// core's control flow.
#[derive(Debug, Error)]
pub enum ErrorResponse {
    /// Configuration error (bad base URL, missing credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout, cancelled call)
    #[error("Network error: {0}")]
    Network(String),

    /// Identity service rejected the request (non-2xx response)
    #[error("Identity service error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Caller-supplied input rejected by the service (weak password, taken username)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parse error (invalid JSON, unexpected response shape)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local credential storage failed during commit or clear
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors from the local token/user stores.
///
/// Kept separate from [`ErrorResponse`] so store implementations stay free of
/// wire-level concerns; the session manager converts at its boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<StorageError> for ErrorResponse {
    fn from(err: StorageError) -> Self {
        ErrorResponse::Storage(err.to_string())
    }
}
