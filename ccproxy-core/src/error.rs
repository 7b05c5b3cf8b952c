//! Error types for ccproxy-core

use thiserror::Error;

/// Main error type for the ccproxy-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A conversation log line that could not be decoded into a record
    #[error("malformed log line: {0}")]
    MalformedLine(String),

    /// No conversation log exists for the session
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Session identifier that cannot name a log file
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error was caused by caller input rather than server state.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::InvalidSessionId(_))
    }
}

/// Result type alias for ccproxy-core
pub type Result<T> = std::result::Result<T, Error>;
