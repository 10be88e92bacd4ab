//! Storage layer errors

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing store could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Backing store rejected or failed the query
    #[error("Query error: {0}")]
    Query(String),

    /// Local I/O failure (file-backed stores)
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error (reading rows or persisted entries)
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Domain error passthrough (malformed identifiers in rows)
    #[error("Domain error: {0}")]
    Domain(#[from] praxis_domain::DomainError),
}

impl StoreError {
    /// Whether the failure is a transport problem worth retrying on user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Io(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            StoreError::Io(err.to_string())
        } else {
            StoreError::Deserialization(err.to_string())
        }
    }
}
