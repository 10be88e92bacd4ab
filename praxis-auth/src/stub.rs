//! Stub identity provider for testing.
//!
//! Simulates sign-in, external session changes (restores, expiry) and
//! sign-out without talking to a real provider.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

use praxis_domain::{Principal, Session};

use crate::error::AuthError;
use crate::events::{SessionEvent, SessionEvents, SessionSubscription};
use crate::ports::IdentityProvider;

/// Lifetime of sessions issued by the stub
const SESSION_TTL_MINUTES: i64 = 60;

/// Registered account: secret plus the principal it signs in as
struct StubAccount {
    secret: String,
    principal: Principal,
}

/// Stub identity provider.
pub struct StubIdentityProvider {
    accounts: RwLock<HashMap<String, StubAccount>>,
    current: RwLock<Option<Session>>,
    events: SessionEvents,
    invalidations: AtomicUsize,
    fail_next_invalidate: AtomicBool,
    fail_next_current_session: AtomicBool,
}

impl StubIdentityProvider {
    /// Create a stub provider with no accounts and no session.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a stub provider with a custom event buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            events: SessionEvents::new(capacity),
            invalidations: AtomicUsize::new(0),
            fail_next_invalidate: AtomicBool::new(false),
            fail_next_current_session: AtomicBool::new(false),
        }
    }

    /// Register an account that can sign in.
    pub fn register(&self, identifier: &str, secret: &str, principal: Principal) {
        let mut accounts = self.accounts.write().unwrap();
        accounts.insert(
            identifier.to_lowercase(),
            StubAccount {
                secret: secret.to_string(),
                principal,
            },
        );
    }

    /// Issue a session for `principal` and publish it, as if the provider
    /// restored or refreshed a session on its own.
    pub fn establish(&self, principal: Principal) -> Session {
        let session = Self::issue(principal);
        *self.current.write().unwrap() = Some(session.clone());
        self.events.publish(SessionEvent::Established(session.clone()));
        session
    }

    /// Hold `session` as the current session without publishing anything
    /// (a session persisted by a previous process).
    pub fn restore(&self, session: Session) {
        *self.current.write().unwrap() = Some(session);
    }

    /// End the current session externally (expiry, revocation elsewhere).
    ///
    /// Does not count as an invalidation call.
    pub fn expire(&self) {
        let ended = self.current.write().unwrap().take();
        if let Some(session) = ended {
            self.events.publish(SessionEvent::Ended {
                principal_id: Some(session.principal.id),
            });
        }
    }

    /// Number of `invalidate_session` calls received.
    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// Whether a session is currently held.
    pub fn has_session(&self) -> bool {
        self.current.read().unwrap().is_some()
    }

    /// Configure the next invalidation to fail at the transport level.
    pub fn set_fail_next_invalidate(&self, fail: bool) {
        self.fail_next_invalidate.store(fail, Ordering::SeqCst);
    }

    /// Configure the next current-session lookup to fail.
    pub fn set_fail_next_current_session(&self, fail: bool) {
        self.fail_next_current_session.store(fail, Ordering::SeqCst);
    }

    fn issue(principal: Principal) -> Session {
        Session {
            principal,
            access_token: format!("stub-{}", Uuid::now_v7()),
            refresh_token: Some(format!("stub-refresh-{}", Uuid::now_v7())),
            expires_at: Some(Utc::now() + Duration::minutes(SESSION_TTL_MINUTES)),
        }
    }
}

impl Default for StubIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        if self.fail_next_current_session.swap(false, Ordering::SeqCst) {
            return Err(AuthError::Transport("Simulated session lookup failure".to_string()));
        }
        Ok(self.current.read().unwrap().clone())
    }

    async fn sign_in_with_credentials(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Session, AuthError> {
        let principal = {
            let accounts = self.accounts.read().unwrap();
            match accounts.get(&identifier.to_lowercase()) {
                Some(account) if account.secret == secret => account.principal.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            }
        };

        tracing::debug!(principal_id = %principal.id, "Stub: signed in");
        Ok(self.establish(principal))
    }

    fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe()
    }

    async fn invalidate_session(&self) -> Result<(), AuthError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);

        if self.fail_next_invalidate.swap(false, Ordering::SeqCst) {
            return Err(AuthError::Transport("Simulated sign-out failure".to_string()));
        }

        let ended = self.current.write().unwrap().take();
        if let Some(session) = ended {
            tracing::debug!(principal_id = %session.principal.id, "Stub: session invalidated");
            self.events.publish(SessionEvent::Ended {
                principal_id: Some(session.principal.id),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
