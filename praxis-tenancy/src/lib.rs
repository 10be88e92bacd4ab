//! Praxis Tenancy Library
//!
//! Session and tenancy core of the clinic admin console.
//!
//! # Architecture
//!
//! ```text
//! IdentityProvider → SessionListener → TenancyContext → watch::Receiver<TenancyState>
//!                                          │
//!                      AdminIdentityResolver + ClinicRegistry (directory ports)
//!                                          │
//!                                   SelectionStore (persisted clinic)
//! ```
//!
//! # Components
//!
//! - **TenancyContext**: Resolution pipeline, state machine and clinic selection
//! - **SessionListener**: Pumps session notifications into the context
//! - **AdminIdentityResolver**: Principal → active admin identity (denial signs out)
//! - **ClinicRegistry**: Active clinics of a hospital in display order
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use praxis_tenancy::{SessionListener, TenancyContext};
//!
//! let context = Arc::new(TenancyContext::new(identity, directory.clone(), directory, selection));
//! let listener = SessionListener::spawn(Arc::clone(&context));
//! context.initialize().await;
//!
//! let scope = context.clinic_scope()?;
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod listener;
pub mod registry;
pub mod resolver;

// Re-exports for convenience
pub use config::{Config, DataStoreConfig, Environment};
pub use context::{TenancyContext, TRANSITION_CAPACITY};
pub use error::{TenancyError, TenancyResult, ACCESS_DENIED_MESSAGE};
pub use listener::SessionListener;
pub use registry::ClinicRegistry;
pub use resolver::AdminIdentityResolver;
