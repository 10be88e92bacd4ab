//! Session and tenancy context.
//!
//! Owns the [`TenancyState`] every console screen scopes its queries with
//! and drives it through the resolution pipeline:
//!
//! ```text
//! session established
//!     → Resolving
//!     → admin lookup ──(none / inactive)──→ Denied  (+ forced sign-out)
//!                    ──(transport)────────→ Failed
//!     → clinic listing ──(transport)──────→ Failed  (admin kept)
//!     → persisted selection → Authorized
//! ```
//!
//! # Generations
//!
//! Every pipeline run, sign-out and external session end starts a new
//! generation. A pipeline step publishes only while its generation is still
//! current, so a late completion of a superseded run is dropped. The check
//! and the write happen under the watch channel's lock, together with the
//! cancellation check that suppresses writes after [`TenancyContext::shutdown`].
//!
//! # Observing
//!
//! [`TenancyContext::subscribe`] is a watch receiver: it sees the latest
//! state and may skip intermediate ones. [`TenancyContext::subscribe_transitions`]
//! receives every published state in order, `Resolving` included.
//!
//! # Lifecycle
//!
//! ```rust,ignore
//! let context = Arc::new(TenancyContext::new(identity, admins, clinics, selection));
//! let listener = SessionListener::spawn(Arc::clone(&context));
//! context.initialize().await;
//! // ...
//! context.shutdown();
//! listener.join().await;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use praxis_auth::{IdentityProvider, SessionSubscription};
use praxis_domain::{
    AdminIdentity, Clinic, ClinicId, ClinicScope, Principal, PrincipalId, Session, TenancyPhase,
    TenancyState,
};
use praxis_store::{AdminDirectory, ClinicDirectory, SelectionStore, SELECTED_CLINIC_KEY};

use crate::error::{TenancyError, TenancyResult};
use crate::registry::ClinicRegistry;
use crate::resolver::AdminIdentityResolver;

// =============================================================================
// Tenancy Context
// =============================================================================

/// Published states buffered per transition subscriber before it lags.
pub const TRANSITION_CAPACITY: usize = 64;

/// Session and tenancy state holder.
pub struct TenancyContext {
    identity: Arc<dyn IdentityProvider>,
    resolver: AdminIdentityResolver,
    registry: ClinicRegistry,
    selection: Arc<dyn SelectionStore>,
    state: watch::Sender<TenancyState>,
    transitions: broadcast::Sender<TenancyState>,
    generation: AtomicU64,
    cancel: CancellationToken,
}

impl TenancyContext {
    /// Create a context in `Idle`.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        admins: Arc<dyn AdminDirectory>,
        clinics: Arc<dyn ClinicDirectory>,
        selection: Arc<dyn SelectionStore>,
    ) -> Self {
        let (state, _) = watch::channel(TenancyState::idle());
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);

        Self {
            resolver: AdminIdentityResolver::new(admins, Arc::clone(&identity)),
            registry: ClinicRegistry::new(clinics),
            identity,
            selection,
            state,
            transitions,
            generation: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// Receiver observing the latest published state.
    pub fn subscribe(&self) -> watch::Receiver<TenancyState> {
        self.state.subscribe()
    }

    /// Receiver of every state published after this call, in publication order.
    ///
    /// A subscriber more than [`TRANSITION_CAPACITY`] states behind gets
    /// `RecvError::Lagged` and continues from the oldest buffered state.
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<TenancyState> {
        self.transitions.subscribe()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> TenancyState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> TenancyPhase {
        self.state.borrow().phase
    }

    pub fn principal(&self) -> Option<Principal> {
        self.state.borrow().principal.clone()
    }

    pub fn admin_identity(&self) -> Option<AdminIdentity> {
        self.state.borrow().admin_identity.clone()
    }

    pub fn current_clinic(&self) -> Option<Clinic> {
        self.state.borrow().current_clinic.clone()
    }

    pub fn available_clinics(&self) -> Vec<Clinic> {
        self.state.borrow().available_clinics.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Hospital and clinic that tenant-scoped queries must filter by.
    ///
    /// # Errors
    /// `TenancyError::NoActiveClinic` unless a clinic is active.
    pub fn clinic_scope(&self) -> TenancyResult<ClinicScope> {
        self.state.borrow().clinic_scope().ok_or(TenancyError::NoActiveClinic)
    }

    /// Current generation (number of runs, sign-outs and session ends so far).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Token fired by [`shutdown`](Self::shutdown).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn session_events(&self) -> SessionSubscription {
        self.identity.subscribe()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restore the session the provider still holds, if any.
    ///
    /// No session leaves a fresh context `Idle`; after a failed restore it
    /// publishes `SignedOut`. A failed lookup publishes `Failed` without
    /// signing anyone out.
    pub async fn initialize(&self) {
        let generation = self.generation();

        match self.identity.current_session().await {
            Ok(Some(session)) => {
                info!(principal_id = %session.principal.id, "Restoring session");
                self.resolve_session(&session).await;
            },
            Ok(None) if self.phase() == TenancyPhase::Failed => {
                info!("No session to restore, clearing restore failure");
                let signed_out = TenancyState::cleared(TenancyPhase::SignedOut, None);
                if !self.commit(generation, signed_out) {
                    debug!(generation, "Discarding stale restore result");
                }
            },
            Ok(None) => info!("No session to restore"),
            Err(e) => {
                let err = TenancyError::AuthInitialization(e);
                error!(error = %err, "Session restore failed");

                let failed = TenancyState::cleared(TenancyPhase::Failed, Some(err.user_message()));
                if !self.commit(generation, failed) {
                    debug!(generation, "Discarding stale restore failure");
                }
            },
        }
    }

    /// Stop publishing. In-flight pipeline steps complete without writing
    /// state or persisted selection.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!(generation = self.generation(), "Tenancy context shutting down");
        }
        self.cancel.cancel();
    }

    // =========================================================================
    // Resolution pipeline
    // =========================================================================

    /// Run the resolution pipeline for a newly established session.
    ///
    /// Supersedes any run still in flight.
    pub async fn resolve_session(&self, session: &Session) {
        let principal = session.principal.clone();
        if let Some(generation) = self.begin_resolution(principal.clone()) {
            self.run_resolution(generation, principal).await;
        }
    }

    /// Re-run the pipeline after a failure. No-op outside `Failed`.
    pub async fn retry(&self) {
        let principal = {
            let state = self.state.borrow();
            if state.phase != TenancyPhase::Failed {
                debug!(phase = %state.phase, "Nothing to retry");
                return;
            }
            state.principal.clone()
        };

        match principal {
            Some(principal) => {
                info!(principal_id = %principal.id, "Retrying resolution");
                if let Some(generation) = self.begin_resolution(principal.clone()) {
                    self.run_resolution(generation, principal).await;
                }
            },
            // Startup retrieval failed, nothing was resolved yet
            None => self.initialize().await,
        }
    }

    /// Publish `Resolving` for `principal` under a new generation.
    ///
    /// Returns `None` after shutdown.
    pub(crate) fn begin_resolution(&self, principal: Principal) -> Option<u64> {
        let principal_id = principal.id.clone();
        let generation = self.advance(|_| TenancyState::resolving(principal))?;

        info!(%principal_id, generation, "Resolving tenancy");
        Some(generation)
    }

    /// Pipeline steps after `Resolving` was published for `generation`.
    pub(crate) async fn run_resolution(&self, generation: u64, principal: Principal) {
        let principal_id = principal.id.clone();

        let admin = match self.resolver.lookup(&principal_id).await {
            Ok(Some(admin)) => admin,
            Ok(None) => {
                self.deny(generation, &principal_id).await;
                return;
            },
            Err(err) => {
                let failed = TenancyState {
                    principal: Some(principal),
                    ..TenancyState::cleared(TenancyPhase::Failed, Some(err.user_message()))
                };
                self.commit_or_discard(generation, failed);
                return;
            },
        };

        if !self.is_current(generation) {
            debug!(%principal_id, generation, "Discarding stale admin lookup");
            return;
        }

        let clinics = match self.registry.list(&admin.hospital_id).await {
            Ok(clinics) => clinics,
            Err(err) => {
                let failed = TenancyState {
                    principal: Some(principal),
                    admin_identity: Some(admin),
                    ..TenancyState::cleared(TenancyPhase::Failed, Some(err.user_message()))
                };
                self.commit_or_discard(generation, failed);
                return;
            },
        };

        if !self.is_current(generation) {
            debug!(%principal_id, generation, "Discarding stale clinic listing");
            return;
        }

        let current_clinic = if clinics.is_empty() {
            None
        } else {
            self.default_clinic(&clinics).await
        };

        let clinic_id = current_clinic.as_ref().map(|c| c.id.to_string());
        let clinic_count = clinics.len();
        let authorized = TenancyState {
            phase: TenancyPhase::Authorized,
            principal: Some(principal),
            admin_identity: Some(admin),
            current_clinic,
            available_clinics: clinics,
            loading: false,
            error: None,
        };

        if self.commit(generation, authorized) {
            info!(
                %principal_id,
                generation,
                clinics = clinic_count,
                clinic_id = clinic_id.as_deref().unwrap_or("-"),
                "Tenancy authorized"
            );
        } else {
            debug!(%principal_id, generation, "Discarding stale resolution");
        }
    }

    /// Publish `Denied`, then force the session out.
    ///
    /// `Denied` goes first so the session-ended notification raised by the
    /// sign-out finds it in place. A stale run signs nobody out: the live
    /// session may already belong to a newer principal.
    async fn deny(&self, generation: u64, principal_id: &PrincipalId) {
        let err = TenancyError::AccessDenied {
            principal_id: principal_id.clone(),
        };
        let denied = TenancyState::cleared(TenancyPhase::Denied, Some(err.user_message()));

        if !self.commit(generation, denied) {
            debug!(%principal_id, generation, "Discarding stale denial");
            return;
        }

        self.resolver.deny(principal_id).await;
    }

    /// Persisted selection if still available, else the first clinic.
    async fn default_clinic(&self, clinics: &[Clinic]) -> Option<Clinic> {
        let persisted = match self.selection.get(SELECTED_CLINIC_KEY).await {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "Persisted clinic selection unreadable, using default");
                None
            },
        };

        if let Some(clinic_id) = persisted.as_deref() {
            if let Some(clinic) = clinics.iter().find(|c| c.id.as_str() == clinic_id) {
                return Some(clinic.clone());
            }
            info!(clinic_id, "Persisted clinic no longer available, using first clinic");
        }

        clinics.first().cloned()
    }

    // =========================================================================
    // Clinic selection
    // =========================================================================

    /// Make `clinic_id` the current clinic and remember it.
    ///
    /// Ignored outside `Authorized` or when the clinic is not available.
    pub async fn switch_clinic(&self, clinic_id: &ClinicId) {
        let mut selected = None;

        self.state.send_if_modified(|state| {
            if self.cancel.is_cancelled() {
                return false;
            }
            let picked = match state.select_clinic(clinic_id) {
                Ok(clinic) => clinic.id.clone(),
                Err(e) => {
                    debug!(%clinic_id, error = %e, "Ignoring clinic switch");
                    return false;
                },
            };
            let _ = self.transitions.send(state.clone());
            selected = Some(picked);
            true
        });

        if let Some(clinic_id) = selected {
            info!(%clinic_id, "Clinic switched");
            self.persist_selection(&clinic_id).await;
        }
    }

    async fn persist_selection(&self, clinic_id: &ClinicId) {
        if self.cancel.is_cancelled() {
            return;
        }
        if let Err(e) = self.selection.set(SELECTED_CLINIC_KEY, clinic_id.as_str()).await {
            warn!(%clinic_id, error = %e, "Failed to persist clinic selection");
        }
    }

    async fn forget_selection(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        if let Err(e) = self.selection.delete(SELECTED_CLINIC_KEY).await {
            warn!(error = %e, "Failed to clear persisted clinic selection");
        }
    }

    // =========================================================================
    // Session end
    // =========================================================================

    /// Sign out: invalidate the provider session and clear everything.
    ///
    /// Local state and the persisted selection are cleared even when the
    /// invalidation fails.
    ///
    /// # Errors
    /// `TenancyError::Auth` when the provider could not invalidate the session.
    pub async fn sign_out(&self) -> TenancyResult<()> {
        let generation = self.supersede();
        debug!(generation, "Signing out");

        let result = self.identity.invalidate_session().await;
        if let Err(e) = &result {
            error!(error = %e, "Session invalidation failed, clearing local state anyway");
        }

        self.advance(|_| TenancyState::cleared(TenancyPhase::SignedOut, None));
        self.forget_selection().await;

        info!("Signed out");
        result.map_err(TenancyError::from)
    }

    /// Clear everything after the provider reported the session ended.
    ///
    /// Does not call back into the provider. A `Denied` state keeps its
    /// phase and message.
    pub async fn handle_session_ended(&self) {
        let cleared = self.advance(|state| match state.phase {
            TenancyPhase::Denied => TenancyState::cleared(TenancyPhase::Denied, state.error.clone()),
            _ => TenancyState::cleared(TenancyPhase::SignedOut, None),
        });

        if cleared.is_some() {
            self.forget_selection().await;
        }
    }

    /// Re-read the provider session after missed notifications.
    pub(crate) async fn resync(&self) {
        match self.identity.current_session().await {
            Ok(Some(session)) => self.resolve_session(&session).await,
            Ok(None) => self.handle_session_ended().await,
            Err(e) => warn!(error = %e, "Session resync failed"),
        }
    }

    // =========================================================================
    // Publication
    // =========================================================================

    fn is_current(&self, generation: u64) -> bool {
        !self.cancel.is_cancelled() && self.generation() == generation
    }

    /// Start a new generation without publishing.
    fn supersede(&self) -> u64 {
        let mut generation = 0;
        self.state.send_if_modified(|_| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            false
        });
        generation
    }

    /// Start a new generation and publish the state built by `next`.
    ///
    /// Returns the new generation, or `None` after shutdown.
    fn advance(&self, next: impl FnOnce(&TenancyState) -> TenancyState) -> Option<u64> {
        let mut started = None;

        self.state.send_if_modified(|state| {
            if self.cancel.is_cancelled() {
                return false;
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let next = next(state);
            self.publish(state, next, generation);
            started = Some(generation);
            true
        });

        started
    }

    /// Publish `next` if `generation` is still current.
    fn commit(&self, generation: u64, next: TenancyState) -> bool {
        self.state.send_if_modified(|state| {
            if self.cancel.is_cancelled() || self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            if !state.phase.can_transition_to(next.phase) {
                warn!(from = %state.phase, to = %next.phase, generation, "Rejecting illegal transition");
                return false;
            }
            if let Err(e) = next.check_invariants() {
                error!(error = %e, generation, "Rejecting inconsistent tenancy state");
                return false;
            }
            self.publish(state, next, generation);
            true
        })
    }

    /// Write `next` under the watch lock and feed the transition stream.
    fn publish(&self, state: &mut TenancyState, next: TenancyState, generation: u64) {
        log_transition(state, &next, generation);
        // No transition subscribers is not an error
        let _ = self.transitions.send(next.clone());
        *state = next;
    }

    fn commit_or_discard(&self, generation: u64, next: TenancyState) {
        let phase = next.phase;
        if !self.commit(generation, next) {
            debug!(%phase, generation, "Discarding stale completion");
        }
    }
}

fn log_transition(from: &TenancyState, to: &TenancyState, generation: u64) {
    if from.phase != to.phase {
        info!(from = %from.phase, to = %to.phase, generation, "Tenancy transition");
    }
}

// =============================================================================
// Tests
// =============================================================================
