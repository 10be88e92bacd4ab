//! Praxis Identity Layer
//!
//! Narrow contract with the external identity provider.
//!
//! # Architecture
//!
//! ```text
//! Login screen → IdentityProvider → SessionEvents → TenancyContext
//! ```
//!
//! # Components
//!
//! - **Ports**: `IdentityProvider` trait (current session, sign-in, subscribe, invalidate)
//! - **Events**: broadcast channel carrying `SessionEstablished` / `SessionEnded`
//! - **Stub**: in-process provider for tests and development
//!
//! # Example
//!
//! ```rust,ignore
//! use praxis_auth::{IdentityProvider, StubIdentityProvider};
//!
//! let provider = StubIdentityProvider::new();
//! provider.register("admin@example.com", "secret", principal);
//!
//! let mut events = provider.subscribe();
//! let session = provider.sign_in_with_credentials("admin@example.com", "secret").await?;
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod events;
pub mod ports;
pub mod stub;

// Re-exports for convenience
pub use error::{AuthError, AuthResult};
pub use events::{SessionEvent, SessionEventKind, SessionEvents, SessionSubscription};
pub use ports::IdentityProvider;
pub use stub::StubIdentityProvider;
