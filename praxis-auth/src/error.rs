//! Identity layer error types.

use thiserror::Error;

/// Errors that can occur talking to the identity provider.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Identifier/secret pair rejected
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Provider could not be reached or failed the request
    #[error("Identity provider transport error: {0}")]
    Transport(String),

    /// Provider answered with something we could not interpret
    #[error("Unexpected identity provider response: {0}")]
    InvalidResponse(String),

    /// Subscriber fell behind and missed session events
    #[error("Session subscriber lagged, missed {0} events")]
    Lagged(u64),
}

/// Result type for identity operations.
pub type AuthResult<T> = Result<T, AuthError>;
