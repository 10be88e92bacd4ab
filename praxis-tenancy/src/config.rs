//! Console configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{TenancyError, TenancyResult};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Configuration
// =============================================================================

/// Default session event buffer
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Default per-request timeout towards the data store
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Console configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Data store configuration
    pub data: DataStoreConfig,

    /// File backing the persisted clinic selection (`None` = in-memory)
    pub selection_path: Option<PathBuf>,

    /// Capacity of the session event channel
    pub event_capacity: usize,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// Managed data store configuration.
#[derive(Debug, Clone)]
pub struct DataStoreConfig {
    /// Base URL of the REST data interface
    pub url: String,
    /// Base URL of the identity provider
    pub auth_url: String,
    /// Project api key
    pub api_key: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> TenancyResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let data = Self::load_data_store_config()?;
        let selection_path = env::var("PRAXIS_SELECTION_PATH").ok().map(PathBuf::from);
        let event_capacity = Self::load_usize_env("PRAXIS_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY)?;

        if event_capacity == 0 {
            return Err(TenancyError::Config(
                "PRAXIS_EVENT_CAPACITY must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            data,
            selection_path,
            event_capacity,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            data: DataStoreConfig {
                url: "http://127.0.0.1:54321".to_string(),
                auth_url: "http://127.0.0.1:54321".to_string(),
                api_key: "test-key".to_string(),
                request_timeout: Duration::from_secs(1),
            },
            selection_path: None,
            event_capacity: 16,
            environment: Environment::Test,
        }
    }

    fn load_environment() -> TenancyResult<Environment> {
        let env_str = env::var("PRAXIS_ENV").unwrap_or_else(|_| "development".to_string());
        Environment::parse(&env_str)
    }

    fn load_data_store_config() -> TenancyResult<DataStoreConfig> {
        let url = env::var("PRAXIS_DATA_URL")
            .unwrap_or_else(|_| "http://localhost:54321".to_string());
        let auth_url = env::var("PRAXIS_AUTH_URL").unwrap_or_else(|_| url.clone());
        let api_key = env::var("PRAXIS_API_KEY").unwrap_or_default();
        let timeout_secs =
            Self::load_u64_env("PRAXIS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        Ok(DataStoreConfig {
            url,
            auth_url,
            api_key,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn load_u64_env(key: &str, default: u64) -> TenancyResult<u64> {
        match env::var(key) {
            Ok(val) => val
                .parse::<u64>()
                .map_err(|_| TenancyError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }

    fn load_usize_env(key: &str, default: usize) -> TenancyResult<usize> {
        match env::var(key) {
            Ok(val) => val
                .parse::<usize>()
                .map_err(|_| TenancyError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataStoreConfig {
                url: "http://localhost:54321".to_string(),
                auth_url: "http://localhost:54321".to_string(),
                api_key: String::new(),
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            selection_path: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            environment: Environment::Development,
        }
    }
}

impl Environment {
    /// Parse an environment name (case-insensitive, short forms accepted).
    pub fn parse(value: &str) -> TenancyResult<Self> {
        match value.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(TenancyError::Config(format!(
                "Invalid PRAXIS_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.event_capacity, 64);
        assert_eq!(config.data.request_timeout, Duration::from_secs(10));
        assert_eq!(config.data.auth_url, config.data.url);
        assert!(config.selection_path.is_none());
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.data.api_key, "test-key");
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("PROD").unwrap(), Environment::Production);
        assert_eq!(Environment::parse("dev").unwrap(), Environment::Development);
        assert!(matches!(Environment::parse("staging"), Err(TenancyError::Config(_))));
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
