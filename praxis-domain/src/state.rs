//! Tenancy state published to every consumer of the admin console.
//!
//! # State Machine
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ↓                                              │
//! Idle → Resolving → Authorized | Denied | Failed ──────────┘ (new session)
//!   └──────── any ──────────→ SignedOut
//! ```
//!
//! # Invariants
//!
//! - A non-empty `current_clinic` is always an element of `available_clinics`
//! - No admin identity means no clinics and no current clinic
//! - Every available clinic belongs to the admin identity's hospital

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::{AdminIdentity, Clinic, ClinicScope, Principal};
use crate::value_objects::{ClinicId, DomainError};

// =============================================================================
// Phase
// =============================================================================

/// Lifecycle phase of the tenancy context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenancyPhase {
    /// No session seen yet
    Idle,
    /// Resolution pipeline in flight
    Resolving,
    /// Admin identity and clinic set resolved
    Authorized,
    /// Principal holds no active admin identity
    Denied,
    /// Transport or startup failure
    Failed,
    /// Session ended (explicitly or externally)
    SignedOut,
}

impl TenancyPhase {
    /// Whether the pipeline has finished for the current session.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Authorized | Self::Denied | Self::Failed)
    }

    /// Check whether moving from `self` to `next` is a legal transition.
    ///
    /// `Resolving` and `SignedOut` are reachable from anywhere; terminal
    /// phases only from `Resolving` (plus `Failed` from `Idle` when startup
    /// session retrieval fails). Self-transitions are allowed for phases
    /// that get republished in place (clinic switch, repeated clearing).
    pub fn can_transition_to(self, next: TenancyPhase) -> bool {
        use TenancyPhase::*;

        match (self, next) {
            (_, Resolving) | (_, SignedOut) => true,
            (Resolving, Authorized) | (Resolving, Denied) | (Resolving, Failed) => true,
            (Idle, Failed) => true,
            (Idle, Idle) | (Authorized, Authorized) | (Denied, Denied) | (Failed, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TenancyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TenancyPhase::Idle => "idle",
            TenancyPhase::Resolving => "resolving",
            TenancyPhase::Authorized => "authorized",
            TenancyPhase::Denied => "denied",
            TenancyPhase::Failed => "failed",
            TenancyPhase::SignedOut => "signed_out",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Tenancy State
// =============================================================================

/// Aggregate runtime state of the session and tenancy context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenancyState {
    /// Current lifecycle phase
    pub phase: TenancyPhase,
    /// Authenticated principal, if any
    pub principal: Option<Principal>,
    /// Resolved admin identity, if any
    pub admin_identity: Option<AdminIdentity>,
    /// Active clinic, if any
    pub current_clinic: Option<Clinic>,
    /// Active clinics of the admin's hospital, ordered by name then id
    pub available_clinics: Vec<Clinic>,
    /// Whether a resolution is in flight
    pub loading: bool,
    /// Human-readable error message, if any
    pub error: Option<String>,
}

impl TenancyState {
    /// Empty state at process start.
    pub fn idle() -> Self {
        Self::cleared(TenancyPhase::Idle, None)
    }

    /// State with every tenancy field empty.
    pub fn cleared(phase: TenancyPhase, error: Option<String>) -> Self {
        Self {
            phase,
            principal: None,
            admin_identity: None,
            current_clinic: None,
            available_clinics: Vec::new(),
            loading: false,
            error,
        }
    }

    /// State published when a resolution starts for `principal`.
    pub fn resolving(principal: Principal) -> Self {
        Self {
            phase: TenancyPhase::Resolving,
            principal: Some(principal),
            loading: true,
            ..Self::cleared(TenancyPhase::Resolving, None)
        }
    }

    /// Whether the admin may operate on tenant data.
    pub fn is_authorized(&self) -> bool {
        self.phase == TenancyPhase::Authorized && self.admin_identity.is_some()
    }

    /// Whether every tenancy field is empty.
    pub fn is_cleared(&self) -> bool {
        self.principal.is_none()
            && self.admin_identity.is_none()
            && self.current_clinic.is_none()
            && self.available_clinics.is_empty()
            && !self.loading
    }

    /// Look up a clinic in the resolved set.
    pub fn find_clinic(&self, clinic_id: &ClinicId) -> Option<&Clinic> {
        self.available_clinics.iter().find(|c| &c.id == clinic_id)
    }

    /// Make `clinic_id` the current clinic.
    ///
    /// # Errors
    /// `DomainError::InvalidStateTransition` outside `Authorized`,
    /// `DomainError::UnknownClinic` if the clinic is not in the resolved set.
    pub fn select_clinic(&mut self, clinic_id: &ClinicId) -> Result<&Clinic, DomainError> {
        if self.phase != TenancyPhase::Authorized {
            return Err(DomainError::InvalidStateTransition(format!(
                "cannot switch clinic while {}",
                self.phase
            )));
        }

        let clinic = self
            .find_clinic(clinic_id)
            .cloned()
            .ok_or_else(|| DomainError::UnknownClinic(clinic_id.to_string()))?;

        Ok(self.current_clinic.insert(clinic))
    }

    /// Identifiers tenant-scoped queries are filtered by.
    pub fn clinic_scope(&self) -> Option<ClinicScope> {
        let admin = self.admin_identity.as_ref()?;
        let clinic = self.current_clinic.as_ref()?;

        Some(ClinicScope {
            hospital_id: admin.hospital_id.clone(),
            clinic_id: clinic.id.clone(),
        })
    }

    /// Check the structural invariants of the state.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if let Some(current) = &self.current_clinic {
            if !self.available_clinics.contains(current) {
                return Err(DomainError::UnknownClinic(format!(
                    "current clinic {} is not among available clinics",
                    current.id
                )));
            }
        }

        match &self.admin_identity {
            None => {
                if self.current_clinic.is_some() || !self.available_clinics.is_empty() {
                    return Err(DomainError::InvalidStateTransition(
                        "clinics present without an admin identity".to_string(),
                    ));
                }
            },
            Some(admin) => {
                if let Some(stray) =
                    self.available_clinics.iter().find(|c| c.hospital_id != admin.hospital_id)
                {
                    return Err(DomainError::InvalidStateTransition(format!(
                        "clinic {} belongs to hospital {}, admin belongs to {}",
                        stray.id, stray.hospital_id, admin.hospital_id
                    )));
                }
            },
        }

        Ok(())
    }
}

impl Default for TenancyState {
    fn default() -> Self {
        Self::idle()
    }
}

// =============================================================================
// Tests
// =============================================================================
