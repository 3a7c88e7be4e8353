//! JWKS client: fetches and caches public signing keys from the identity
//! provider's well-known endpoint.
//!
//! Keys are cached process-wide with a TTL so verification does not pay a
//! network round trip per request. A cold or expired cache triggers a
//! single-flight refresh: concurrent verifications wait on one fetch instead
//! of each issuing their own.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Infrastructure failure while obtaining the key set.
///
/// Unknown keys and invalid tokens are NOT errors at this layer; this only
/// covers fetch/parse failures talking to the identity provider.
#[derive(Debug, Error)]
pub enum JwksError {
    #[error("JWKS endpoint unavailable: {0}")]
    Unavailable(String),
}

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("OKP" for Ed25519).
    pub kty: String,

    /// Key ID, used to select the key for verification.
    pub kid: String,

    /// Public key value (base64url encoded).
    #[serde(default)]
    pub x: Option<String>,

    /// Algorithm (expected "EdDSA").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (expected "sig").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document: `{"keys": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

struct CachedJwks {
    keys: HashMap<String, Jwk>,
    expires_at: Instant,
}

/// Caching JWKS client.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    /// Serializes cache refreshes (single-flight).
    refresh_lock: Mutex<()>,
    cache_ttl: Duration,
}

impl JwksClient {
    pub fn new(jwks_url: String) -> Self {
        Self::with_ttl(jwks_url, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "api.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Mutex::new(()),
            cache_ttl,
        }
    }

    /// Pre-warm the key cache at startup.
    ///
    /// Failure is logged but never fatal; the first verification will fetch
    /// on demand instead.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) {
        if let Err(e) = self.refresh_cache().await {
            tracing::warn!(target: "api.auth.jwks", error = %e, "JWKS pre-load failed; will fetch on first verification");
        } else {
            tracing::info!(target: "api.auth.jwks", "JWKS cache pre-loaded");
        }
    }

    /// Look up a JWK by key ID, refreshing the cache if cold or expired.
    ///
    /// Returns `Ok(None)` when the key set does not contain `kid` (an
    /// expected outcome for tokens signed with unknown keys); errors only on
    /// fetch failure.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Option<Jwk>, JwksError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    let hit = cached.keys.get(kid).cloned();
                    tracing::debug!(
                        target: "api.auth.jwks",
                        kid = %kid,
                        found = hit.is_some(),
                        "JWKS cache hit"
                    );
                    return Ok(hit);
                }
            }
        }

        self.refresh_cache().await?;

        let cache = self.cache.read().await;
        let found = cache
            .as_ref()
            .and_then(|cached| cached.keys.get(kid).cloned());

        if found.is_none() {
            tracing::warn!(target: "api.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
        }
        Ok(found)
    }

    /// Refresh the cache from the JWKS endpoint.
    ///
    /// Concurrent callers coalesce on the refresh lock; whoever loses the
    /// race re-checks the cache and skips the duplicate fetch.
    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<(), JwksError> {
        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited for the lock.
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    return Ok(());
                }
            }
        }

        tracing::debug!(target: "api.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "api.auth.jwks", error = %e, "Failed to fetch JWKS");
                JwksError::Unavailable(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "api.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(JwksError::Unavailable(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "api.auth.jwks", error = %e, "Failed to parse JWKS response");
            JwksError::Unavailable(e.to_string())
        })?;

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "api.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            expires_at: Instant::now() + self.cache_ttl,
        });

        Ok(())
    }
}
