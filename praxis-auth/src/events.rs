//! Session-change notifications.
//!
//! Providers publish every session change on a broadcast channel; each
//! subscriber gets its own receiver. Dropping the `SessionSubscription`
//! is the unsubscribe.

use praxis_domain::{PrincipalId, Session};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::AuthError;

// =============================================================================
// Event Types
// =============================================================================

/// Session change reported by the identity provider.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session became valid (sign-in, restored session, token refresh)
    Established(Session),

    /// The session ended (sign-out, expiry, revocation)
    Ended {
        /// Principal whose session ended, when known
        principal_id: Option<PrincipalId>,
    },
}

/// Discriminant of a `SessionEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    SessionEstablished,
    SessionEnded,
}

impl SessionEvent {
    /// Event kind.
    pub fn kind(&self) -> SessionEventKind {
        match self {
            SessionEvent::Established(_) => SessionEventKind::SessionEstablished,
            SessionEvent::Ended { .. } => SessionEventKind::SessionEnded,
        }
    }

    /// Principal the event is about, when known.
    pub fn principal_id(&self) -> Option<&PrincipalId> {
        match self {
            SessionEvent::Established(session) => Some(session.principal_id()),
            SessionEvent::Ended { principal_id } => principal_id.as_ref(),
        }
    }
}

// =============================================================================
// Event Channel
// =============================================================================

/// Fan-out channel for session events.
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Create a channel with the given buffer capacity.
    ///
    /// Subscribers that fall more than `capacity` events behind start lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that got the event (0 if none).
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Receiving half of a session event subscription.
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    /// Receive the next event.
    ///
    /// Returns `None` once the provider is gone, `Some(Err(Lagged))` if
    /// events were dropped because this subscriber fell behind.
    pub async fn recv(&mut self) -> Option<Result<SessionEvent, AuthError>> {
        match self.receiver.recv().await {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(count)) => Some(Err(AuthError::Lagged(count))),
        }
    }

    /// Receive an event without waiting.
    pub fn try_recv(&mut self) -> Option<Result<SessionEvent, AuthError>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::TryRecvError::Empty) => None,
            Err(broadcast::error::TryRecvError::Closed) => None,
            Err(broadcast::error::TryRecvError::Lagged(count)) => Some(Err(AuthError::Lagged(count))),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use praxis_domain::Principal;

    fn session(principal: &str) -> Session {
        Session::new(Principal::new(PrincipalId::new(principal).unwrap()), "token")
    }

    #[tokio::test]
    async fn test_publish_recv() {
        let events = SessionEvents::new(8);
        let mut subscription = events.subscribe();

        events.publish(SessionEvent::Established(session("p-1")));

        let event = subscription.recv().await.unwrap().unwrap();
        assert_eq!(event.kind(), SessionEventKind::SessionEstablished);
        assert_eq!(event.principal_id().unwrap().as_str(), "p-1");
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let events = SessionEvents::new(8);
        let subscription = events.subscribe();
        assert_eq!(events.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(events.subscriber_count(), 0);
        assert_eq!(events.publish(SessionEvent::Ended { principal_id: None }), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let events = SessionEvents::new(1);
        let mut subscription = events.subscribe();

        events.publish(SessionEvent::Established(session("p-1")));
        events.publish(SessionEvent::Established(session("p-2")));

        let lagged = subscription.recv().await.unwrap();
        assert!(matches!(lagged, Err(AuthError::Lagged(1))));

        let event = subscription.recv().await.unwrap().unwrap();
        assert_eq!(event.principal_id().unwrap().as_str(), "p-2");
    }

    #[test]
    fn test_try_recv_empty() {
        let events = SessionEvents::default();
        let mut subscription = events.subscribe();
        assert!(subscription.try_recv().is_none());
    }
}
