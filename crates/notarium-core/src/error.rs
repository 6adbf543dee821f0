//! Error types for notarium.

use thiserror::Error;

/// Result type alias using notarium's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notarium operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Note not found (or soft-deleted)
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Notebook not found (or soft-deleted)
    #[error("Notebook not found: {0}")]
    NotebookNotFound(uuid::Uuid),

    /// Embedding provider failed (non-success status, transport error,
    /// or malformed response)
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Message bus error
    #[error("Bus error: {0}")]
    Bus(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl Error {
    /// Whether the error refers to a missing note or notebook.
    ///
    /// Not-found failures are terminal for a given event: redelivery will
    /// keep failing until the bus's retry limit applies.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NoteNotFound(_) | Error::NotebookNotFound(_))
    }
}
