//! Praxis Remote Connectors
//!
//! Adapters for the remote managed data store and its identity provider.
//! Normalizes REST rows and token responses to domain types.
//!
//! - `RestDirectory`: admin identity and clinic lookups (PostgREST-style filters),
//!   authorized with the live session's token via `AccessTokenSource`
//! - `RestIdentityProvider`: password-grant sign-in, logout, session events

#![warn(clippy::all)]

// Public modules
pub mod client;
pub mod rest_directory;
pub mod rest_identity;

// Re-exports
pub use client::{ConnectorError, RestClient, RestConfig};
pub use rest_directory::{AccessTokenSource, RestDirectory};
pub use rest_identity::RestIdentityProvider;
