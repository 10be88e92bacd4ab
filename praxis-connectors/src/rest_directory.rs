//! Admin identity and clinic lookups against the managed data store.
//!
//! # Endpoints
//!
//! | Method | Path | Filter |
//! |--------|------|--------|
//! | GET | `/rest/v1/admin_users` | `user_id=eq.<principal>` |
//! | GET | `/rest/v1/clinics` | `hospital_id=eq.<hospital>&is_active=eq.true` |

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use praxis_domain::{AdminId, AdminIdentity, ClinicId, DomainError, HospitalId, PrincipalId};
use praxis_store::{AdminDirectory, ClinicDirectory, ClinicRecord, StoreError};

use crate::client::{RestClient, RestConfig};

const ADMIN_USERS_PATH: &str = "rest/v1/admin_users";
const CLINICS_PATH: &str = "rest/v1/clinics";

// =============================================================================
// Row Types
// =============================================================================

/// `admin_users` row
#[derive(Debug, Clone, Deserialize)]
pub struct AdminUserRow {
    pub id: String,
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub is_active: bool,
    pub hospital_id: String,
}

impl TryFrom<AdminUserRow> for AdminIdentity {
    type Error = DomainError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        Ok(AdminIdentity {
            id: AdminId::new(row.id)?,
            principal_id: PrincipalId::new(row.user_id)?,
            email: row.email,
            full_name: row.full_name.unwrap_or_default(),
            role: row.role.unwrap_or_else(|| "admin".to_string()),
            is_active: row.is_active,
            hospital_id: HospitalId::new(row.hospital_id)?,
        })
    }
}

/// `clinics` row
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicRow {
    pub id: String,
    pub name: String,
    pub hospital_id: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl TryFrom<ClinicRow> for ClinicRecord {
    type Error = DomainError;

    fn try_from(row: ClinicRow) -> Result<Self, Self::Error> {
        Ok(ClinicRecord {
            id: ClinicId::new(row.id)?,
            name: row.name,
            hospital_id: HospitalId::new(row.hospital_id)?,
            is_active: row.is_active,
        })
    }
}

// =============================================================================
// REST Directory
// =============================================================================

/// Source of the signed-in user's access token.
///
/// Implemented by identity providers so the directory follows whichever
/// session is live instead of a token captured once.
pub trait AccessTokenSource: Send + Sync {
    /// Access token of the live session, if any.
    fn access_token(&self) -> Option<String>;
}

/// Directory adapter over the data store's REST interface.
pub struct RestDirectory {
    client: RestClient,
    /// Explicit access token (row-level security), overrides `token_source`
    access_token: RwLock<Option<String>>,
    token_source: Option<Arc<dyn AccessTokenSource>>,
}

impl RestDirectory {
    /// Create a directory adapter.
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: RestClient::new(config),
            access_token: RwLock::new(None),
            token_source: None,
        }
    }

    /// Take the bearer token from `source` on every query.
    pub fn with_token_source(mut self, source: Arc<dyn AccessTokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    /// Use a fixed user token for subsequent queries (`None` reverts to the
    /// token source, then to the project api key).
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn bearer(&self) -> Option<String> {
        let explicit = self.access_token.read().unwrap_or_else(PoisonError::into_inner).clone();
        explicit.or_else(|| self.token_source.as_ref().and_then(|source| source.access_token()))
    }
}

#[async_trait]
impl AdminDirectory for RestDirectory {
    async fn find_admin_by_principal(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Option<AdminIdentity>, StoreError> {
        let query = [
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", principal_id)),
            ("limit", "1".to_string()),
        ];

        let bearer = self.bearer();
        let rows: Vec<AdminUserRow> =
            self.client.get_json(ADMIN_USERS_PATH, &query, bearer.as_deref()).await?;

        debug!(%principal_id, rows = rows.len(), "Admin lookup");

        match rows.into_iter().next() {
            Some(row) => Ok(Some(AdminIdentity::try_from(row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ClinicDirectory for RestDirectory {
    async fn list_clinics(&self, hospital_id: &HospitalId) -> Result<Vec<ClinicRecord>, StoreError> {
        let query = [
            ("select", "id,name,hospital_id,is_active".to_string()),
            ("hospital_id", format!("eq.{}", hospital_id)),
            ("is_active", "eq.true".to_string()),
            ("order", "name.asc,id.asc".to_string()),
        ];

        let bearer = self.bearer();
        let rows: Vec<ClinicRow> =
            self.client.get_json(CLINICS_PATH, &query, bearer.as_deref()).await?;

        debug!(%hospital_id, rows = rows.len(), "Clinic listing");

        rows.into_iter()
            .map(|row| ClinicRecord::try_from(row).map_err(StoreError::from))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
