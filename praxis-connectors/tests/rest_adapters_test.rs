//! Contract tests for the REST directory and identity provider.
//!
//! A wiremock server stands in for the managed data store; each test pins
//! the path, filters and headers the adapters must send.

use praxis_auth::{AuthError, IdentityProvider, SessionEventKind};
use praxis_domain::{HospitalId, PrincipalId};
use praxis_store::{AdminDirectory, ClinicDirectory, StoreError};
use praxis_connectors::{RestConfig, RestDirectory, RestIdentityProvider};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> RestConfig {
    RestConfig::new(server.uri(), "anon-key").with_timeout(Duration::from_secs(5))
}

fn token_body(user_id: &str) -> serde_json::Value {
    token_body_with(user_id, "user-jwt")
}

fn token_body_with(user_id: &str, access_token: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh",
        "user": { "id": user_id, "email": "admin@example.com" }
    })
}

// ── GET /rest/v1/admin_users ─────────────────────────────────────────

#[tokio::test]
async fn admin_lookup_filters_by_principal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/admin_users"))
        .and(query_param("user_id", "eq.p-1"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": "a-1",
            "user_id": "p-1",
            "email": "admin@example.com",
            "full_name": "Dr. Admin",
            "role": "admin",
            "is_active": true,
            "hospital_id": "h-1"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let directory = RestDirectory::new(config(&server));
    let admin = directory
        .find_admin_by_principal(&PrincipalId::new("p-1").unwrap())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(admin.hospital_id.as_str(), "h-1");
    assert_eq!(admin.full_name, "Dr. Admin");
    assert!(admin.is_active);
}

#[tokio::test]
async fn admin_lookup_uses_user_token_when_set() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/admin_users"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let directory = RestDirectory::new(config(&server));
    directory.set_access_token(Some("user-jwt".to_string()));

    let admin = directory
        .find_admin_by_principal(&PrincipalId::new("p-1").unwrap())
        .await
        .unwrap();
    assert!(admin.is_none());
}

#[tokio::test]
async fn admin_lookup_follows_each_provider_session() {
    let server = MockServer::start().await;

    for (email, user_id, jwt) in [("a@example.com", "p-1", "jwt-a"), ("b@example.com", "p-2", "jwt-b")] {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(body_json(serde_json::json!({ "email": email, "password": "secret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body_with(user_id, jwt)))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    for bearer in ["Bearer jwt-a", "Bearer anon-key", "Bearer jwt-b"] {
        Mock::given(method("GET"))
            .and(path("/rest/v1/admin_users"))
            .and(header("authorization", bearer))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;
    }

    let provider = Arc::new(RestIdentityProvider::new(config(&server), 8));
    let directory = RestDirectory::new(config(&server)).with_token_source(provider.clone());
    let principal = PrincipalId::new("p-1").unwrap();

    provider.sign_in_with_credentials("a@example.com", "secret").await.unwrap();
    directory.find_admin_by_principal(&principal).await.unwrap();

    // Signed out: falls back to the project key
    provider.invalidate_session().await.unwrap();
    directory.find_admin_by_principal(&principal).await.unwrap();

    provider.sign_in_with_credentials("b@example.com", "secret").await.unwrap();
    directory.find_admin_by_principal(&principal).await.unwrap();
}

#[tokio::test]
async fn admin_lookup_server_error_is_query_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/admin_users"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "message": "relation does not exist"
        })))
        .mount(&server)
        .await;

    let directory = RestDirectory::new(config(&server));
    let err = directory
        .find_admin_by_principal(&PrincipalId::new("p-1").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Query(ref msg) if msg.contains("relation does not exist")));
}

// ── GET /rest/v1/clinics ─────────────────────────────────────────────

#[tokio::test]
async fn clinic_listing_filters_active_rows_of_hospital() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("hospital_id", "eq.h-1"))
        .and(query_param("is_active", "eq.true"))
        .and(query_param("order", "name.asc,id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "c1", "name": "Eastside", "hospital_id": "h-1", "is_active": true },
            { "id": "c2", "name": "Westside", "hospital_id": "h-1", "is_active": true }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let directory = RestDirectory::new(config(&server));
    let rows = directory.list_clinics(&HospitalId::new("h-1").unwrap()).await.unwrap();

    let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);
}

#[tokio::test]
async fn clinic_listing_unreachable_is_connection_error() {
    // Nothing listens on this port
    let directory = RestDirectory::new(
        RestConfig::new("http://127.0.0.1:9", "anon-key").with_timeout(Duration::from_secs(2)),
    );

    let err = directory.list_clinics(&HospitalId::new("h-1").unwrap()).await.unwrap_err();
    assert!(err.is_transient());
}

// ── POST /auth/v1/token ──────────────────────────────────────────────

#[tokio::test]
async fn sign_in_issues_session_and_publishes_event() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_json(serde_json::json!({
            "email": "admin@example.com",
            "password": "secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("p-1")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = RestIdentityProvider::new(config(&server), 8);
    let mut events = provider.subscribe();

    let session = provider
        .sign_in_with_credentials("admin@example.com", "secret")
        .await
        .unwrap();
    assert_eq!(session.principal_id().as_str(), "p-1");
    assert_eq!(session.access_token, "user-jwt");

    let event = events.recv().await.unwrap().unwrap();
    assert_eq!(event.kind(), SessionEventKind::SessionEstablished);
    assert!(provider.current_session().await.unwrap().is_some());
}

#[tokio::test]
async fn sign_in_rejected_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let provider = RestIdentityProvider::new(config(&server), 8);
    let err = provider
        .sign_in_with_credentials("admin@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(provider.current_session().await.unwrap().is_none());
}

// ── POST /auth/v1/logout ─────────────────────────────────────────────

#[tokio::test]
async fn logout_revokes_with_user_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("p-1")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let provider = RestIdentityProvider::new(config(&server), 8);
    provider.sign_in_with_credentials("admin@example.com", "secret").await.unwrap();
    let mut events = provider.subscribe();

    provider.invalidate_session().await.unwrap();
    // Second call has no session and must not hit the server again
    provider.invalidate_session().await.unwrap();

    let event = events.recv().await.unwrap().unwrap();
    assert_eq!(event.kind(), SessionEventKind::SessionEnded);
    assert!(provider.current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn logout_transport_failure_keeps_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("p-1")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = RestIdentityProvider::new(config(&server), 8);
    provider.sign_in_with_credentials("admin@example.com", "secret").await.unwrap();

    let err = provider.invalidate_session().await.unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)));
    assert!(provider.current_session().await.unwrap().is_some());
}
