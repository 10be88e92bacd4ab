//! Value Objects for the Praxis Domain
//!
//! Identifiers issued by the identity provider and the backing data store.
//! They are opaque strings; the only invariant enforced is that they are
//! non-empty after trimming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Identifier was empty or whitespace
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Clinic is not part of the resolved clinic set
    #[error("Unknown clinic: {0}")]
    UnknownClinic(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier with validation
            ///
            /// # Errors
            /// Returns `DomainError::InvalidIdentifier` if the value is blank
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::InvalidIdentifier(format!(
                        "{} must not be empty",
                        $label
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Get the underlying string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = DomainError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

opaque_id!(
    /// Identifier of an authenticated principal, issued by the identity provider
    PrincipalId,
    "principal id"
);

opaque_id!(
    /// Identifier of an administrative identity row
    AdminId,
    "admin id"
);

opaque_id!(
    /// Identifier of a hospital (the top-level tenant)
    HospitalId,
    "hospital id"
);

opaque_id!(
    /// Identifier of a clinic within a hospital
    ClinicId,
    "clinic id"
);

// =============================================================================
// Tests
// =============================================================================
