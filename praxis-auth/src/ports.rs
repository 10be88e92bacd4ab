//! Identity provider port definition.
//!
//! The provider is an external collaborator: it issues and validates
//! sessions, reports session changes, and supports explicit sign-out.
//! Adapters implement this port for specific providers (REST, stub).

use async_trait::async_trait;

use praxis_domain::Session;

use crate::error::AuthError;
use crate::events::SessionSubscription;

/// Port for the external identity provider.
///
/// Implementations:
/// - `StubIdentityProvider` - For testing (in-process accounts)
/// - `RestIdentityProvider` - Password-grant REST provider (`praxis-connectors`)
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session the provider currently holds, if any.
    ///
    /// Called once at startup to restore a session that survived a reload.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Exchange an identifier/secret pair for a session.
    ///
    /// On success the provider also publishes `SessionEvent::Established`.
    async fn sign_in_with_credentials(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Session, AuthError>;

    /// Subscribe to session-change notifications.
    ///
    /// Dropping the returned subscription unsubscribes.
    fn subscribe(&self) -> SessionSubscription;

    /// Invalidate the current session.
    ///
    /// Publishes `SessionEvent::Ended` when a session was live. Calling it
    /// without a live session succeeds and publishes nothing.
    async fn invalidate_session(&self) -> Result<(), AuthError>;
}
