//! Clinic registry.
//!
//! Lists the active clinics of a hospital in display order. Directory
//! adapters may pre-filter or pre-sort; the registry does both again so
//! the ordering never depends on the backing store.

use std::sync::Arc;
use tracing::{debug, error, warn};

use praxis_domain::{Clinic, HospitalId};
use praxis_store::ClinicDirectory;

use crate::error::{TenancyError, TenancyResult};

/// Active clinics of a hospital, ordered by name then id.
pub struct ClinicRegistry {
    directory: Arc<dyn ClinicDirectory>,
}

impl ClinicRegistry {
    /// Create a registry over a clinic directory.
    pub fn new(directory: Arc<dyn ClinicDirectory>) -> Self {
        Self { directory }
    }

    /// List the active clinics of `hospital_id`.
    ///
    /// # Errors
    /// `TenancyError::RegistryUnavailable` when the directory fails.
    pub async fn list(&self, hospital_id: &HospitalId) -> TenancyResult<Vec<Clinic>> {
        let records = self.directory.list_clinics(hospital_id).await.map_err(|e| {
            error!(%hospital_id, error = %e, "Clinic listing failed");
            TenancyError::RegistryUnavailable(e)
        })?;

        let mut clinics: Vec<Clinic> = records
            .into_iter()
            .filter(|record| record.is_active)
            .filter(|record| {
                let own = &record.hospital_id == hospital_id;
                if !own {
                    warn!(%hospital_id, clinic_id = %record.id, "Dropping clinic of another hospital");
                }
                own
            })
            .map(|record| record.into_clinic())
            .collect();

        clinics.sort_by(|a, b| {
            a.name.cmp(&b.name).then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });

        debug!(%hospital_id, count = clinics.len(), "Clinics listed");
        Ok(clinics)
    }
}

// =============================================================================
// Tests
// =============================================================================
