//! Service configuration.
//!
//! Configuration is loaded from environment variables. Sensitive fields
//! (database URL, API keys) are redacted in Debug output.

use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default JWT clock skew tolerance (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Prevents misconfiguration that would weaken token freshness checks.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Default page size when a list request supplies no limit.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// A configured API key bound to a target (tenant).
///
/// Both fields must match an inbound request exactly; a valid key presented
/// with another tenant's target id is rejected.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyEntry {
    pub key: String,
    pub target_id: String,
}

impl fmt::Debug for ApiKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyEntry")
            .field("key", &"[REDACTED]")
            .field("target_id", &self.target_id)
            .finish()
    }
}

/// Service configuration, loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// URL of the identity provider's JWKS endpoint.
    pub jwks_url: String,

    /// Expected token issuer; issuer validation is skipped when unset.
    pub jwt_issuer: Option<String>,

    /// Expected token audience; audience validation is skipped when unset.
    pub jwt_audience: Option<String>,

    /// JWT clock skew tolerance in seconds for iat validation.
    pub jwt_clock_skew_seconds: i64,

    /// Table holding feedback items.
    pub feedback_table: String,

    /// Table holding report items.
    pub reports_table: String,

    /// Static API key registry for write-endpoint authentication.
    pub api_keys: Vec<ApiKeyEntry>,

    /// CORS allowed origins; "*" allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("feedback_table", &self.feedback_table)
            .field("reports_table", &self.reports_table)
            .field("api_key_count", &self.api_keys.len())
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid API_KEYS configuration: {0}")]
    InvalidApiKeys(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| "http://localhost:8082/.well-known/jwks.json".to_string());

        let jwt_issuer = vars.get("JWT_ISSUER").cloned();
        let jwt_audience = vars.get("JWT_AUDIENCE").cloned();

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let feedback_table = vars
            .get("FEEDBACK_TABLE_NAME")
            .cloned()
            .unwrap_or_else(|| "feedback_items".to_string());

        let reports_table = vars
            .get("REPORTS_TABLE_NAME")
            .cloned()
            .unwrap_or_else(|| "report_items".to_string());

        // JSON array of {"key": "...", "targetId": "..."} entries
        let api_keys = match vars.get("API_KEYS") {
            Some(raw) => serde_json::from_str::<Vec<ApiKeyEntry>>(raw)
                .map_err(|e| ConfigError::InvalidApiKeys(e.to_string()))?,
            None => Vec::new(),
        };

        let cors_allowed_origins = vars
            .get("CORS_ALLOWED_ORIGINS")
            .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
            .unwrap_or_else(|| vec!["*".to_string()]);

        Ok(Config {
            database_url,
            bind_address,
            jwks_url,
            jwt_issuer,
            jwt_audience,
            jwt_clock_skew_seconds,
            feedback_table,
            reports_table,
            api_keys,
            cors_allowed_origins,
        })
    }
}
