//! Admin identity resolution.
//!
//! Maps an authenticated principal to its active administrative identity.
//! A principal without one must not keep a live session, so denial always
//! comes with a forced sign-out against the identity provider.

use std::sync::Arc;
use tracing::{error, info, warn};

use praxis_auth::IdentityProvider;
use praxis_domain::{AdminIdentity, PrincipalId};
use praxis_store::AdminDirectory;

use crate::error::{TenancyError, TenancyResult};

/// Resolves principals to active admin identities.
pub struct AdminIdentityResolver {
    directory: Arc<dyn AdminDirectory>,
    identity: Arc<dyn IdentityProvider>,
}

impl AdminIdentityResolver {
    /// Create a resolver over an admin directory and the identity provider
    /// whose session gets revoked on denial.
    pub fn new(directory: Arc<dyn AdminDirectory>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            directory,
            identity,
        }
    }

    /// Resolve `principal_id` to its active admin identity.
    ///
    /// # Errors
    /// - `TenancyError::AccessDenied` when no active identity exists; the
    ///   current session has been invalidated by the time this returns
    /// - `TenancyError::Store` when the directory could not be queried
    pub async fn resolve(&self, principal_id: &PrincipalId) -> TenancyResult<AdminIdentity> {
        match self.lookup(principal_id).await? {
            Some(admin) => Ok(admin),
            None => Err(self.deny(principal_id).await),
        }
    }

    /// Read-only lookup of the active admin identity of `principal_id`.
    ///
    /// Inactive rows are reported as `None`.
    pub async fn lookup(&self, principal_id: &PrincipalId) -> TenancyResult<Option<AdminIdentity>> {
        let row = self.directory.find_admin_by_principal(principal_id).await.map_err(|e| {
            error!(%principal_id, error = %e, "Admin lookup failed");
            TenancyError::Store(e)
        })?;

        match row {
            Some(admin) if admin.is_active => Ok(Some(admin)),
            Some(admin) => {
                info!(%principal_id, admin_id = %admin.id, "Admin identity is inactive");
                Ok(None)
            },
            None => {
                info!(%principal_id, "No admin identity for principal");
                Ok(None)
            },
        }
    }

    /// Force the current session out and build the denial error.
    ///
    /// A failed invalidation is logged; the principal is denied either way.
    pub async fn deny(&self, principal_id: &PrincipalId) -> TenancyError {
        warn!(%principal_id, "Access denied, invalidating session");

        if let Err(e) = self.identity.invalidate_session().await {
            error!(%principal_id, error = %e, "Forced sign-out failed");
        }

        TenancyError::AccessDenied {
            principal_id: principal_id.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
