//! Storage trait definitions (Ports)
//!
//! These traits define the storage interface for the tenancy context.
//! Implementations can be a remote REST data store, a JSON file,
//! or in-memory for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use praxis_domain::{AdminIdentity, Clinic, ClinicId, HospitalId, PrincipalId};
use serde::{Deserialize, Serialize};

/// Well-known key holding the last explicitly selected clinic id.
pub const SELECTED_CLINIC_KEY: &str = "praxis.selected_clinic_id";

/// Clinic row as stored, including its activation flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicRecord {
    pub id: ClinicId,
    pub name: String,
    pub hospital_id: HospitalId,
    pub is_active: bool,
}

impl ClinicRecord {
    /// Create an active clinic row.
    pub fn active(id: ClinicId, name: impl Into<String>, hospital_id: HospitalId) -> Self {
        Self {
            id,
            name: name.into(),
            hospital_id,
            is_active: true,
        }
    }

    /// Create an inactive clinic row.
    pub fn inactive(id: ClinicId, name: impl Into<String>, hospital_id: HospitalId) -> Self {
        Self {
            is_active: false,
            ..Self::active(id, name, hospital_id)
        }
    }

    /// Drop the activation flag.
    pub fn into_clinic(self) -> Clinic {
        Clinic::new(self.id, self.name, self.hospital_id)
    }
}

/// Directory of administrative identities
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Find the admin identity row bound to a principal.
    ///
    /// Returns the row regardless of its `is_active` flag; callers decide
    /// what an inactive row means.
    async fn find_admin_by_principal(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Option<AdminIdentity>, StoreError>;
}

/// Directory of clinics
#[async_trait]
pub trait ClinicDirectory: Send + Sync {
    /// List clinic rows of a hospital.
    ///
    /// Implementations may pre-filter inactive rows or pre-sort by name;
    /// callers must not rely on either.
    async fn list_clinics(&self, hospital_id: &HospitalId) -> Result<Vec<ClinicRecord>, StoreError>;
}

/// Durable key/value entry store surviving process restarts
#[async_trait]
pub trait SelectionStore: Send + Sync {
    /// Read an entry; `None` means the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write an entry
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove an entry (absent keys are not an error)
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
