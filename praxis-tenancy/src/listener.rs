//! Session event pump.
//!
//! Drains the identity provider's session notifications into the context:
//! an established session starts a resolution on its own task, an ended
//! session clears the context inline. Events are handled in arrival order,
//! so each resolution's generation is taken before the next event is read.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use praxis_auth::{AuthError, SessionEvent, SessionSubscription};

use crate::context::TenancyContext;

/// Handle of the running listener task.
pub struct SessionListener {
    handle: JoinHandle<()>,
}

impl SessionListener {
    /// Subscribe to the context's identity provider and start pumping.
    ///
    /// The subscription is taken before this returns, so no event published
    /// afterwards is missed. The task stops when the context shuts down.
    pub fn spawn(context: Arc<TenancyContext>) -> Self {
        let subscription = context.session_events();
        let cancel = context.cancellation_token();
        let handle = tokio::spawn(Self::run(context, subscription, cancel));

        Self { handle }
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to exit.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Session listener task failed");
        }
    }

    async fn run(
        context: Arc<TenancyContext>,
        mut subscription: SessionSubscription,
        cancel: CancellationToken,
    ) {
        info!("Session listener started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = subscription.recv() => match next {
                    Some(Ok(event)) => Self::dispatch(&context, event).await,
                    Some(Err(AuthError::Lagged(missed))) => {
                        warn!(missed, "Session listener lagged, resynchronizing");
                        context.resync().await;
                    },
                    Some(Err(e)) => warn!(error = %e, "Session event error"),
                    None => {
                        info!("Session event channel closed");
                        break;
                    },
                },
            }
        }

        info!("Session listener stopped");
    }

    async fn dispatch(context: &Arc<TenancyContext>, event: SessionEvent) {
        match event {
            SessionEvent::Established(session) => {
                let principal = session.principal;
                if let Some(generation) = context.begin_resolution(principal.clone()) {
                    let context = Arc::clone(context);
                    tokio::spawn(async move {
                        context.run_resolution(generation, principal).await;
                    });
                }
            },
            SessionEvent::Ended { principal_id } => {
                debug!(principal_id = ?principal_id.as_ref().map(|id| id.as_str()), "Session ended");
                context.handle_session_ended().await;
            },
        }
    }
}
