//! Praxis Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains identities, organizational units, and the tenancy state
//! every admin-console screen scopes its data access with.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod state;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{AdminIdentity, Clinic, ClinicScope, Principal, Session};
pub use state::{TenancyPhase, TenancyState};
pub use value_objects::{AdminId, ClinicId, DomainError, HospitalId, PrincipalId};
