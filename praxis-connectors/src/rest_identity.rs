//! Identity provider adapter over the data store's auth REST interface.
//!
//! # Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/auth/v1/token?grant_type=password` | Sign in with email + password |
//! | POST | `/auth/v1/logout` | Revoke the current session |
//!
//! The adapter keeps the current session in memory; it does not persist
//! tokens across processes.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use praxis_auth::{AuthError, IdentityProvider, SessionEvent, SessionEvents, SessionSubscription};
use praxis_domain::{Principal, PrincipalId, Session};

use crate::client::{ConnectorError, RestClient, RestConfig};
use crate::rest_directory::AccessTokenSource;

const TOKEN_PATH: &str = "auth/v1/token";
const LOGOUT_PATH: &str = "auth/v1/logout";

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

/// Token response of a successful sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// User object embedded in token responses.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl TryFrom<TokenResponse> for Session {
    type Error = AuthError;

    fn try_from(token: TokenResponse) -> Result<Self, Self::Error> {
        let id = PrincipalId::new(token.user.id)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let mut principal = Principal::new(id);
        principal.email = token.user.email;

        Ok(Session {
            principal,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}

// =============================================================================
// REST Identity Provider
// =============================================================================

/// Password-grant identity provider.
pub struct RestIdentityProvider {
    client: RestClient,
    current: RwLock<Option<Session>>,
    events: SessionEvents,
}

impl RestIdentityProvider {
    /// Create a provider; `event_capacity` bounds the session event buffer.
    pub fn new(config: RestConfig, event_capacity: usize) -> Self {
        Self {
            client: RestClient::new(config),
            current: RwLock::new(None),
            events: SessionEvents::new(event_capacity),
        }
    }

    // Plain Option: a panicked writer cannot leave it half-updated
    fn read_current(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_current(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn end_session(&self, session: Session) {
        self.events.publish(SessionEvent::Ended {
            principal_id: Some(session.principal.id),
        });
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let expired = {
            let mut current = self.write_current();
            let is_expired = current.as_ref().map(|s| s.is_expired(Utc::now())).unwrap_or(false);
            if !is_expired {
                return Ok(current.clone());
            }
            current.take()
        };

        if let Some(session) = expired {
            info!(principal_id = %session.principal.id, "Session expired");
            self.end_session(session);
        }
        Ok(None)
    }

    async fn sign_in_with_credentials(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Session, AuthError> {
        let grant = PasswordGrant {
            email: identifier,
            password: secret,
        };
        let query = [("grant_type", "password".to_string())];

        let token: TokenResponse = self
            .client
            .post_json(TOKEN_PATH, &query, &grant, None)
            .await
            .map_err(|e| match e.status() {
                Some(400) | Some(401) => AuthError::InvalidCredentials,
                _ => AuthError::Transport(e.to_string()),
            })?;

        let session = Session::try_from(token)?;
        info!(principal_id = %session.principal.id, "Signed in");

        *self.write_current() = Some(session.clone());
        self.events.publish(SessionEvent::Established(session.clone()));
        Ok(session)
    }

    fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe()
    }

    async fn invalidate_session(&self) -> Result<(), AuthError> {
        let token = match self.read_current().as_ref() {
            Some(session) => session.access_token.clone(),
            None => {
                debug!("No session to invalidate");
                return Ok(());
            },
        };

        match self.client.post_empty(LOGOUT_PATH, Some(&token)).await {
            Ok(()) => {},
            // Token already revoked or unknown: the session is gone either way
            Err(ConnectorError::ApiError { status: 401 | 403 | 404, message }) => {
                warn!(%message, "Logout rejected, treating session as ended");
            },
            Err(e) => return Err(AuthError::Transport(e.to_string())),
        }

        let ended = self.write_current().take();
        if let Some(session) = ended {
            info!(principal_id = %session.principal.id, "Signed out");
            self.end_session(session);
        }
        Ok(())
    }
}

impl AccessTokenSource for RestIdentityProvider {
    fn access_token(&self) -> Option<String> {
        self.read_current()
            .as_ref()
            .filter(|session| !session.is_expired(Utc::now()))
            .map(|session| session.access_token.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_to_session() {
        let token: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": { "id": "p-1", "email": "admin@example.com" }
        }))
        .unwrap();

        let session = Session::try_from(token).unwrap();
        assert_eq!(session.principal_id().as_str(), "p-1");
        assert_eq!(session.principal.email.as_deref(), Some("admin@example.com"));
        assert!(!session.is_expired(Utc::now()));
    }

    fn session(id: &str, token: &str) -> Session {
        Session {
            principal: Principal::new(PrincipalId::new(id).unwrap()),
            access_token: token.to_string(),
            refresh_token: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_poisoned_session_lock_still_usable() {
        let provider = std::sync::Arc::new(RestIdentityProvider::new(
            RestConfig::new("http://localhost", "key"),
            8,
        ));
        *provider.write_current() = Some(session("p-1", "jwt-1"));

        let holder = std::sync::Arc::clone(&provider);
        let poisoned = std::thread::spawn(move || {
            let _guard = holder.current.write().unwrap();
            panic!("writer died holding the session lock");
        })
        .join();
        assert!(poisoned.is_err());
        assert!(provider.current.is_poisoned());

        let current = provider.current_session().await.unwrap();
        assert_eq!(current.unwrap().principal_id().as_str(), "p-1");
        assert_eq!(provider.access_token().as_deref(), Some("jwt-1"));
    }

    #[test]
    fn test_access_token_skips_expired_session() {
        let provider = RestIdentityProvider::new(RestConfig::new("http://localhost", "key"), 8);
        assert_eq!(provider.access_token(), None);

        let mut expired = session("p-1", "jwt-1");
        expired.expires_at = Some(Utc::now() - Duration::seconds(5));
        *provider.write_current() = Some(expired);
        assert_eq!(provider.access_token(), None);
    }

    #[test]
    fn test_token_without_user_id_rejected() {
        let token = TokenResponse {
            access_token: "jwt".to_string(),
            refresh_token: None,
            expires_in: None,
            user: AuthUser {
                id: "".to_string(),
                email: None,
            },
        };
        assert!(matches!(Session::try_from(token), Err(AuthError::InvalidResponse(_))));
    }
}
