//! Domain Entities for Praxis
//!
//! Who is signed in, which administrative identity they hold, and which
//! organizational units (hospital → clinics) they may operate within.

use crate::value_objects::{AdminId, ClinicId, HospitalId, PrincipalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Principal / Session
// =============================================================================

/// An authenticated caller as reported by the identity provider.
///
/// Ephemeral: only exists while its session is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque identifier issued by the identity provider
    pub id: PrincipalId,
    /// Sign-in email, when the provider exposes one
    pub email: Option<String>,
}

impl Principal {
    /// Create a principal with no email attached.
    pub fn new(id: PrincipalId) -> Self {
        Self { id, email: None }
    }

    /// Attach the sign-in email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A live identity-provider session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Principal the session was issued to
    pub principal: Principal,
    /// Bearer token presented to the data store
    pub access_token: String,
    /// Refresh token, if issued
    pub refresh_token: Option<String>,
    /// Expiry reported by the provider
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session without refresh token or expiry.
    pub fn new(principal: Principal, access_token: impl Into<String>) -> Self {
        Self {
            principal,
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Principal identifier shortcut.
    pub fn principal_id(&self) -> &PrincipalId {
        &self.principal.id
    }

    /// Whether the provider-reported expiry lies in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

// =============================================================================
// AdminIdentity
// =============================================================================

/// Administrative identity bound to exactly one principal.
///
/// An identity with `is_active = false` is treated as nonexistent.
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub id: AdminId,
    pub principal_id: PrincipalId,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub hospital_id: HospitalId,
}

// =============================================================================
// Clinic
// =============================================================================

/// A clinic belonging to exactly one hospital.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: ClinicId,
    pub name: String,
    pub hospital_id: HospitalId,
}

impl Clinic {
    /// Create a clinic.
    pub fn new(id: ClinicId, name: impl Into<String>, hospital_id: HospitalId) -> Self {
        Self {
            id,
            name: name.into(),
            hospital_id,
        }
    }
}

/// Pair of identifiers injected into every tenant-scoped query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClinicScope {
    /// Hospital the clinic belongs to
    pub hospital_id: HospitalId,
    /// Active clinic
    pub clinic_id: ClinicId,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn principal() -> Principal {
        Principal::new(PrincipalId::new("p-1").unwrap()).with_email("admin@example.com")
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let mut session = Session::new(principal(), "token");
        assert!(!session.is_expired(now));

        session.expires_at = Some(now - Duration::seconds(1));
        assert!(session.is_expired(now));

        session.expires_at = Some(now + Duration::minutes(5));
        assert!(!session.is_expired(now));
    }

    #[test]
    fn test_admin_identity_serialization() {
        let admin = AdminIdentity {
            id: AdminId::new("a-1").unwrap(),
            principal_id: PrincipalId::new("p-1").unwrap(),
            email: "admin@example.com".to_string(),
            full_name: "Dr. Admin".to_string(),
            role: "admin".to_string(),
            is_active: true,
            hospital_id: HospitalId::new("h-1").unwrap(),
        };

        let json = serde_json::to_value(&admin).unwrap();
        assert_eq!(json["hospital_id"], "h-1");
        assert_eq!(json["principal_id"], "p-1");

        let parsed: AdminIdentity = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, admin);
    }
}
