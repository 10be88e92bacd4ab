//! Tenancy error types.
//!
//! Errors raised inside the resolution pipeline are captured into
//! `TenancyState::error` via [`TenancyError::user_message`]; only
//! `sign_out` and `clinic_scope` return them to callers.

use praxis_auth::AuthError;
use praxis_domain::{DomainError, PrincipalId};
use praxis_store::StoreError;
use thiserror::Error;

/// Message shown when a principal holds no active admin identity.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied. Admin privileges required.";

/// Tenancy-level errors.
#[derive(Debug, Error)]
pub enum TenancyError {
    /// Principal has no active administrative identity
    #[error("Access denied for principal {principal_id}: admin privileges required")]
    AccessDenied { principal_id: PrincipalId },

    /// Clinic listing failed at the transport level
    #[error("Clinic registry unavailable: {0}")]
    RegistryUnavailable(#[source] StoreError),

    /// Startup session retrieval failed
    #[error("Authentication initialization failed: {0}")]
    AuthInitialization(#[source] AuthError),

    /// No clinic is active
    #[error("No active clinic")]
    NoActiveClinic,

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Identity provider error
    #[error("Identity provider error: {0}")]
    Auth(#[from] AuthError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TenancyError {
    /// Message suitable for display in the console.
    pub fn user_message(&self) -> String {
        match self {
            TenancyError::AccessDenied { .. } => ACCESS_DENIED_MESSAGE.to_string(),
            TenancyError::RegistryUnavailable(_) => {
                "Could not load clinics. Please try again.".to_string()
            },
            TenancyError::AuthInitialization(_) => {
                "Could not restore your session. Please sign in again.".to_string()
            },
            TenancyError::Store(_) => {
                "Could not verify admin access. Please try again.".to_string()
            },
            TenancyError::NoActiveClinic => "Select a clinic to continue.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the same call may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TenancyError::RegistryUnavailable(_) | TenancyError::AuthInitialization(_) => true,
            TenancyError::Store(e) => e.is_transient(),
            TenancyError::Auth(AuthError::Transport(_)) => true,
            _ => false,
        }
    }
}

/// Result type for tenancy operations.
pub type TenancyResult<T> = Result<T, TenancyError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_message() {
        let err = TenancyError::AccessDenied {
            principal_id: PrincipalId::new("p-1").unwrap(),
        };
        assert_eq!(err.user_message(), ACCESS_DENIED_MESSAGE);
        assert!(err.to_string().contains("p-1"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_registry_unavailable_is_retryable() {
        let err = TenancyError::RegistryUnavailable(StoreError::Connection("refused".into()));
        assert!(err.is_retryable());
        assert!(!err.user_message().contains("refused"));
    }
}
