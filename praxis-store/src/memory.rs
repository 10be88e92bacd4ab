//! In-memory store implementations
//!
//! Used for testing and development without a backing data store.
//! Thread-safe using RwLock for concurrent access.
//!
//! Both stores support failure injection (`set_fail_next_*`) in the same
//! one-shot style: the flag is consumed by the next matching call.

use crate::error::StoreError;
use crate::repository::{AdminDirectory, ClinicDirectory, ClinicRecord, SelectionStore};
use async_trait::async_trait;
use praxis_domain::{AdminIdentity, HospitalId, PrincipalId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

// =============================================================================
// Memory Directory
// =============================================================================

/// In-memory directory of admin identities and clinics
pub struct MemoryDirectory {
    admins: RwLock<Vec<AdminIdentity>>,
    clinics: RwLock<Vec<ClinicRecord>>,
    /// Artificial latency per principal lookup
    admin_delays: RwLock<HashMap<PrincipalId, Duration>>,
    /// Artificial latency for clinic listings
    clinic_delay: RwLock<Option<Duration>>,
    fail_next_admin_lookup: AtomicBool,
    fail_next_clinic_listing: AtomicBool,
    admin_lookups: AtomicUsize,
    clinic_listings: AtomicUsize,
}

impl MemoryDirectory {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self {
            admins: RwLock::new(Vec::new()),
            clinics: RwLock::new(Vec::new()),
            admin_delays: RwLock::new(HashMap::new()),
            clinic_delay: RwLock::new(None),
            fail_next_admin_lookup: AtomicBool::new(false),
            fail_next_clinic_listing: AtomicBool::new(false),
            admin_lookups: AtomicUsize::new(0),
            clinic_listings: AtomicUsize::new(0),
        }
    }

    /// Insert or replace the admin identity of a principal
    pub fn upsert_admin(&self, admin: AdminIdentity) {
        let mut admins = self.admins.write().unwrap();
        admins.retain(|a| a.principal_id != admin.principal_id);
        admins.push(admin);
    }

    /// Insert or replace a clinic row
    pub fn upsert_clinic(&self, clinic: ClinicRecord) {
        let mut clinics = self.clinics.write().unwrap();
        clinics.retain(|c| c.id != clinic.id);
        clinics.push(clinic);
    }

    /// Delay admin lookups for one principal
    pub fn set_admin_lookup_delay(&self, principal_id: PrincipalId, delay: Duration) {
        self.admin_delays.write().unwrap().insert(principal_id, delay);
    }

    /// Delay every clinic listing
    pub fn set_clinic_listing_delay(&self, delay: Option<Duration>) {
        *self.clinic_delay.write().unwrap() = delay;
    }

    /// Configure the next admin lookup to fail
    pub fn set_fail_next_admin_lookup(&self, fail: bool) {
        self.fail_next_admin_lookup.store(fail, Ordering::SeqCst);
    }

    /// Configure the next clinic listing to fail
    pub fn set_fail_next_clinic_listing(&self, fail: bool) {
        self.fail_next_clinic_listing.store(fail, Ordering::SeqCst);
    }

    /// Number of admin lookups served
    pub fn admin_lookup_count(&self) -> usize {
        self.admin_lookups.load(Ordering::SeqCst)
    }

    /// Number of clinic listings served
    pub fn clinic_listing_count(&self) -> usize {
        self.clinic_listings.load(Ordering::SeqCst)
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.admins.write().unwrap().clear();
        self.clinics.write().unwrap().clear();
        self.admin_delays.write().unwrap().clear();
        *self.clinic_delay.write().unwrap() = None;
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminDirectory for MemoryDirectory {
    async fn find_admin_by_principal(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Option<AdminIdentity>, StoreError> {
        self.admin_lookups.fetch_add(1, Ordering::SeqCst);

        let delay = self.admin_delays.read().unwrap().get(principal_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_next_admin_lookup.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Connection("Simulated admin lookup failure".to_string()));
        }

        let admins = self.admins.read().unwrap();
        Ok(admins.iter().find(|a| &a.principal_id == principal_id).cloned())
    }
}

#[async_trait]
impl ClinicDirectory for MemoryDirectory {
    async fn list_clinics(&self, hospital_id: &HospitalId) -> Result<Vec<ClinicRecord>, StoreError> {
        self.clinic_listings.fetch_add(1, Ordering::SeqCst);

        let delay = *self.clinic_delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_next_clinic_listing.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Connection("Simulated clinic listing failure".to_string()));
        }

        let clinics = self.clinics.read().unwrap();
        Ok(clinics.iter().filter(|c| &c.hospital_id == hospital_id).cloned().collect())
    }
}

// =============================================================================
// Memory Selection Store
// =============================================================================

/// In-memory key/value store (does not survive restarts)
pub struct MemorySelectionStore {
    entries: RwLock<HashMap<String, String>>,
    fail_next_read: AtomicBool,
    fail_next_write: AtomicBool,
    writes: AtomicUsize,
}

impl MemorySelectionStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            fail_next_read: AtomicBool::new(false),
            fail_next_write: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Create a store pre-populated with one entry
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.entries.write().unwrap().insert(key.to_string(), value.to_string());
        store
    }

    /// Read an entry synchronously (for assertions)
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.read().unwrap().get(key).cloned()
    }

    /// Number of successful set/delete calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Configure the next read to fail
    pub fn set_fail_next_read(&self, fail: bool) {
        self.fail_next_read.store(fail, Ordering::SeqCst);
    }

    /// Configure the next write (set or delete) to fail
    pub fn set_fail_next_write(&self, fail: bool) {
        self.fail_next_write.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Io("Simulated write failure".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for MemorySelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SelectionStore for MemorySelectionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Io("Simulated read failure".to_string()));
        }
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.entries.write().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.entries.write().unwrap().remove(key);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
