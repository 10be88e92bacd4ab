//! Shared fixtures for tenancy integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use praxis_auth::StubIdentityProvider;
use praxis_domain::{
    AdminId, AdminIdentity, ClinicId, HospitalId, Principal, PrincipalId, Session, TenancyState,
};
use praxis_store::{ClinicRecord, MemoryDirectory, MemorySelectionStore};
use praxis_tenancy::TenancyContext;

/// Context wired to in-memory adapters, with handles for assertions.
pub struct Harness {
    pub identity: Arc<StubIdentityProvider>,
    pub directory: Arc<MemoryDirectory>,
    pub selection: Arc<MemorySelectionStore>,
    pub context: Arc<TenancyContext>,
}

impl Harness {
    /// Hospital `h-1` with admin `p-1` and clinics Westside (c2), Eastside (c1).
    pub fn new() -> Self {
        Self::with_selection(MemorySelectionStore::new())
    }

    pub fn with_selection(selection: MemorySelectionStore) -> Self {
        let identity = Arc::new(StubIdentityProvider::new());
        let directory = Arc::new(MemoryDirectory::new());
        let selection = Arc::new(selection);

        directory.upsert_admin(admin("p-1", "h-1", true));
        directory.upsert_clinic(clinic_record("c2", "Westside", "h-1"));
        directory.upsert_clinic(clinic_record("c1", "Eastside", "h-1"));

        let context = Arc::new(TenancyContext::new(
            identity.clone(),
            directory.clone(),
            directory.clone(),
            selection.clone(),
        ));

        Self {
            identity,
            directory,
            selection,
            context,
        }
    }

    /// Second context over the same adapters (a fresh process).
    pub fn restart(&self) -> Arc<TenancyContext> {
        Arc::new(TenancyContext::new(
            self.identity.clone(),
            self.directory.clone(),
            self.directory.clone(),
            self.selection.clone(),
        ))
    }

    /// Establish a provider session for `id` and run the pipeline on it.
    pub async fn sign_in(&self, id: &str) -> Session {
        let session = self.identity.establish(principal(id));
        self.context.resolve_session(&session).await;
        session
    }
}

pub fn principal(id: &str) -> Principal {
    Principal::new(PrincipalId::new(id).unwrap()).with_email(format!("{}@example.com", id))
}

pub fn admin(principal_id: &str, hospital_id: &str, active: bool) -> AdminIdentity {
    AdminIdentity {
        id: AdminId::new(format!("a-{}", principal_id)).unwrap(),
        principal_id: PrincipalId::new(principal_id).unwrap(),
        email: format!("{}@example.com", principal_id),
        full_name: format!("Admin {}", principal_id),
        role: "admin".to_string(),
        is_active: active,
        hospital_id: HospitalId::new(hospital_id).unwrap(),
    }
}

pub fn clinic_record(id: &str, name: &str, hospital_id: &str) -> ClinicRecord {
    ClinicRecord::active(
        ClinicId::new(id).unwrap(),
        name,
        HospitalId::new(hospital_id).unwrap(),
    )
}

pub fn clinic_id(id: &str) -> ClinicId {
    ClinicId::new(id).unwrap()
}

pub fn clinic_ids(state: &TenancyState) -> Vec<&str> {
    state.available_clinics.iter().map(|c| c.id.as_str()).collect()
}

/// Structural invariants hold for the current state.
pub fn assert_consistent(context: &TenancyContext) {
    let state = context.snapshot();
    if let Err(e) = state.check_invariants() {
        panic!("inconsistent state {:?}: {}", state, e);
    }
}

/// Wait until the published state satisfies `predicate`.
pub async fn wait_for_state(
    context: &TenancyContext,
    predicate: impl FnMut(&TenancyState) -> bool,
) -> TenancyState {
    let mut states = context.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), states.wait_for(predicate))
        .await
        .expect("timed out waiting for tenancy state")
        .expect("tenancy context dropped");
    TenancyState::clone(&state)
}

/// Poll `condition` until it holds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
