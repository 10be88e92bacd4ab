//! Praxis Console
//!
//! Signs an admin in, resolves their tenancy and keeps the context live
//! until Ctrl-C, then signs out.
//!
//! # Usage
//!
//! ```bash
//! PRAXIS_EMAIL=admin@example.com PRAXIS_PASSWORD=secret cargo run -p praxis-tenancy
//!
//! # Start in a specific clinic
//! PRAXIS_CLINIC=c2 cargo run -p praxis-tenancy
//! ```
//!
//! # Environment Variables
//!
//! - `PRAXIS_ENV`: Environment (test, development, production)
//! - `PRAXIS_DATA_URL`: REST data store base URL (default: http://localhost:54321)
//! - `PRAXIS_AUTH_URL`: Identity provider base URL (default: `PRAXIS_DATA_URL`)
//! - `PRAXIS_API_KEY`: Project api key
//! - `PRAXIS_SELECTION_PATH`: File remembering the selected clinic (default: in-memory)
//! - `PRAXIS_EVENT_CAPACITY`: Session event buffer (default: 64)
//! - `PRAXIS_REQUEST_TIMEOUT_SECS`: Request timeout (default: 10)
//! - `PRAXIS_EMAIL`, `PRAXIS_PASSWORD`: Sign-in credentials
//! - `PRAXIS_CLINIC`: Clinic to switch to after sign-in (optional)

use anyhow::Context;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use praxis_auth::IdentityProvider;
use praxis_connectors::{RestConfig, RestDirectory, RestIdentityProvider};
use praxis_domain::ClinicId;
use praxis_store::{FileSelectionStore, MemorySelectionStore, SelectionStore};
use praxis_tenancy::{Config, SessionListener, TenancyContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("praxis_tenancy=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        data_url = %config.data.url,
        "Praxis Console"
    );

    let email = env::var("PRAXIS_EMAIL").context("PRAXIS_EMAIL is not set")?;
    let password = env::var("PRAXIS_PASSWORD").context("PRAXIS_PASSWORD is not set")?;

    // Adapters; the directory authorizes with whatever session the provider holds
    let identity = Arc::new(RestIdentityProvider::new(
        RestConfig::new(&config.data.auth_url, &config.data.api_key)
            .with_timeout(config.data.request_timeout),
        config.event_capacity,
    ));
    let directory = Arc::new(
        RestDirectory::new(
            RestConfig::new(&config.data.url, &config.data.api_key)
                .with_timeout(config.data.request_timeout),
        )
        .with_token_source(identity.clone()),
    );
    let selection: Arc<dyn SelectionStore> = match &config.selection_path {
        Some(path) => Arc::new(FileSelectionStore::new(path)),
        None => Arc::new(MemorySelectionStore::new()),
    };

    // Sign in before the listener runs; initialize() picks the session up
    identity.sign_in_with_credentials(&email, &password).await?;

    let context = Arc::new(TenancyContext::new(
        identity.clone(),
        directory.clone(),
        directory.clone(),
        selection,
    ));
    let listener = SessionListener::spawn(Arc::clone(&context));
    context.initialize().await;

    if let Ok(clinic) = env::var("PRAXIS_CLINIC") {
        let clinic_id = ClinicId::new(clinic)?;
        context.switch_clinic(&clinic_id).await;
    }

    let state = context.snapshot();
    info!(
        phase = %state.phase,
        admin = state.admin_identity.as_ref().map(|a| a.email.as_str()).unwrap_or("-"),
        clinic = state.current_clinic.as_ref().map(|c| c.name.as_str()).unwrap_or("-"),
        clinics = state.available_clinics.len(),
        error = state.error.as_deref().unwrap_or("-"),
        "Tenancy resolved"
    );

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Shutdown signal received");

    if let Err(e) = context.sign_out().await {
        warn!(error = %e, "Sign-out incomplete");
    }

    context.shutdown();
    listener.join().await;

    Ok(())
}
