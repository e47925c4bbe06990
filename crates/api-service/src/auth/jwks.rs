//! JWKS client for fetching and caching the identity provider's signing keys.
//!
//! The JWKS (JSON Web Key Set) client fetches public keys from the configured
//! endpoint (for Cognito, `{endpoint}/{pool}/.well-known/jwks.json`) and
//! caches them with a configurable TTL.
//!
//! # Security
//!
//! - Keys are cached to reduce load on the identity provider and improve latency
//! - Cache is invalidated on TTL expiry to pick up key rotations
//! - An unknown `kid` triggers a refresh at most once per minimum refresh
//!   interval, so random kids cannot force a fetch per request
//! - Concurrent refreshes are coalesced into a single outbound request
//! - Only RSA signing keys usable with RS256 are retained

use crate::observability::metrics;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Default outbound request timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default minimum time between kid-miss refreshes, in seconds.
pub const DEFAULT_MIN_REFRESH_SECONDS: u64 = 10;

/// Minimum time between refreshes triggered by an unknown `kid`.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(DEFAULT_MIN_REFRESH_SECONDS);

/// Errors from resolving a signing key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyResolutionError {
    #[error("no signing key for kid {0}")]
    KeyNotFound(String),

    /// Transport error, timeout, or non-2xx status.
    #[error("JWKS fetch failed: {0}")]
    FetchFailed(String),

    /// Response body was not a JWKS document.
    #[error("JWKS parse failed: {0}")]
    ParseFailed(String),
}

/// Source of signing keys, looked up by key ID.
///
/// [`JwksClient`] is the production implementation. Tests substitute fakes.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, kid: &str) -> Result<SigningKey, KeyResolutionError>;
}

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (only "RSA" is retained).
    #[serde(default)]
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm (should be "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// A public key ready for RS256 signature verification.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Build a signing key from an RSA modulus and exponent (base64url).
    ///
    /// # Errors
    ///
    /// Returns `KeyResolutionError::ParseFailed` if either component is not
    /// valid base64url.
    pub fn from_rsa_components(kid: &str, n: &str, e: &str) -> Result<Self, KeyResolutionError> {
        let decoding_key = DecodingKey::from_rsa_components(n, e)
            .map_err(|err| KeyResolutionError::ParseFailed(err.to_string()))?;

        Ok(Self {
            kid: kid.to_string(),
            algorithm: Algorithm::RS256,
            decoding_key,
        })
    }

    /// Convert a JWK, rejecting anything that is not an RS256 signing key.
    ///
    /// The error is a short reason for debug logs.
    fn from_jwk(jwk: &Jwk) -> Result<Self, &'static str> {
        if jwk.kty != "RSA" {
            return Err("unsupported key type");
        }
        if let Some(alg) = jwk.alg.as_deref() {
            if alg != common::jwt::RS256 {
                return Err("unsupported algorithm");
            }
        }
        if let Some(key_use) = jwk.key_use.as_deref() {
            if key_use != "sig" {
                return Err("not a signing key");
            }
        }

        let kid = non_empty(jwk.kid.as_deref()).ok_or("missing kid")?;
        let n = non_empty(jwk.n.as_deref()).ok_or("missing modulus")?;
        let e = non_empty(jwk.e.as_deref()).ok_or("missing exponent")?;

        Self::from_rsa_components(kid, n, e).map_err(|_| "invalid key material")
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Keep usable keys, keyed by kid. The first occurrence of a kid wins.
pub(crate) fn index_keys(jwks: JwksResponse) -> HashMap<String, SigningKey> {
    let mut keys = HashMap::with_capacity(jwks.keys.len());

    for jwk in &jwks.keys {
        match SigningKey::from_jwk(jwk) {
            Ok(key) => {
                if keys.contains_key(key.kid()) {
                    tracing::debug!(target: "api.auth.jwks", kid = %key.kid(), "Skipping duplicate kid");
                    continue;
                }
                keys.insert(key.kid().to_string(), key);
            }
            Err(reason) => {
                tracing::debug!(
                    target: "api.auth.jwks",
                    kid = ?jwk.kid,
                    kty = %jwk.kty,
                    reason = reason,
                    "Skipping JWK"
                );
            }
        }
    }

    keys
}

/// Cached JWKS data.
struct CachedJwks {
    /// Map of key ID to signing key.
    keys: HashMap<String, SigningKey>,

    fetched_at: Instant,
}

/// Outcome of a cache read.
enum CacheLookup {
    Hit(SigningKey),
    /// Cache is fresh but has no such kid.
    Miss,
    /// Cache is empty or past its TTL.
    Stale,
}

/// Bookkeeping guarded by the refresh mutex.
#[derive(Default)]
struct RefreshState {
    /// Start of the last refresh triggered by an unknown kid. Prefetches,
    /// TTL refreshes and forced refreshes leave it untouched.
    last_kid_miss_refresh: Option<Instant>,
    last_error: Option<KeyResolutionError>,
}

/// JWKS client for fetching and caching public keys.
///
/// Thread-safe client that fetches the JWKS document and caches the keys
/// with configurable TTL. Reads share an `RwLock`; refreshes are serialized
/// by a `Mutex` so concurrent misses cost one request.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached JWKS data.
    cache: Arc<RwLock<Option<CachedJwks>>>,

    /// Cache TTL duration.
    cache_ttl: Duration,

    min_refresh_interval: Duration,

    /// Held for the duration of a fetch.
    refresh_state: Mutex<RefreshState>,

    /// Incremented after every completed fetch attempt.
    refresh_generation: AtomicU64,
}

impl JwksClient {
    /// Create a new JWKS client with default TTL and timeout.
    pub fn new(jwks_url: String) -> Self {
        Self::with_options(
            jwks_url,
            Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
        )
    }

    /// Create a new JWKS client with custom cache TTL and fetch timeout.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the JWKS document
    /// * `cache_ttl` - How long to cache JWKS before refreshing
    /// * `fetch_timeout` - Upper bound on a single outbound request
    pub fn with_options(jwks_url: String, cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "api.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
            refresh_state: Mutex::new(RefreshState::default()),
            refresh_generation: AtomicU64::new(0),
        }
    }

    /// Override the minimum interval between kid-miss refreshes.
    #[must_use]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    pub fn min_refresh_interval(&self) -> Duration {
        self.min_refresh_interval
    }

    /// Prefetch the key set. Failure is logged, not fatal.
    pub async fn warm(&self) {
        match self.force_refresh().await {
            Ok(key_count) => {
                tracing::info!(target: "api.auth.jwks", key_count = key_count, "JWKS prefetched");
            }
            Err(e) => {
                tracing::warn!(
                    target: "api.auth.jwks",
                    error = %e,
                    "JWKS prefetch failed, keys will be fetched on first request"
                );
            }
        }
    }

    /// Refetch unconditionally, returning the number of usable keys.
    ///
    /// Useful for testing or manual cache invalidation.
    ///
    /// # Errors
    ///
    /// Returns `FetchFailed` or `ParseFailed` if the document cannot be loaded.
    pub async fn force_refresh(&self) -> Result<usize, KeyResolutionError> {
        let mut state = self.refresh_state.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Make sure a fresh key set is cached, returning its key count.
    ///
    /// Used by the readiness check. Fetches only when the cache is stale.
    ///
    /// # Errors
    ///
    /// Returns `FetchFailed` or `ParseFailed` if a needed fetch fails.
    pub async fn ensure_fresh(&self) -> Result<usize, KeyResolutionError> {
        let generation = self.refresh_generation.load(Ordering::Acquire);
        if let Some(count) = self.fresh_key_count().await {
            return Ok(count);
        }

        let mut state = self.refresh_state.lock().await;
        if self.refresh_generation.load(Ordering::Acquire) != generation {
            if let Some(err) = state.last_error.clone() {
                return Err(err);
            }
            if let Some(count) = self.fresh_key_count().await {
                return Ok(count);
            }
        }

        self.refresh_locked(&mut state).await
    }

    async fn fresh_key_count(&self) -> Option<usize> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.cache_ttl)
            .map(|cached| cached.keys.len())
    }

    async fn lookup(&self, kid: &str) -> CacheLookup {
        let cache = self.cache.read().await;
        match cache.as_ref() {
            Some(cached) if cached.fetched_at.elapsed() < self.cache_ttl => {
                match cached.keys.get(kid) {
                    Some(key) => CacheLookup::Hit(key.clone()),
                    None => CacheLookup::Miss,
                }
            }
            _ => CacheLookup::Stale,
        }
    }

    /// Fetch the document and replace the cache. Caller holds the refresh lock.
    async fn refresh_locked(&self, state: &mut RefreshState) -> Result<usize, KeyResolutionError> {
        let start = Instant::now();
        let result = self.fetch_keys().await;
        let duration = start.elapsed();

        let outcome = match result {
            Ok(keys) => {
                let key_count = keys.len();
                tracing::info!(
                    target: "api.auth.jwks",
                    key_count = key_count,
                    "JWKS cache refreshed"
                );

                let mut cache = self.cache.write().await;
                *cache = Some(CachedJwks {
                    keys,
                    fetched_at: Instant::now(),
                });
                state.last_error = None;
                metrics::record_jwks_refresh("success", duration);
                Ok(key_count)
            }
            Err(e) => {
                state.last_error = Some(e.clone());
                metrics::record_jwks_refresh("error", duration);
                Err(e)
            }
        };

        self.refresh_generation.fetch_add(1, Ordering::Release);
        outcome
    }

    /// Fetch and parse the JWKS document.
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    async fn fetch_keys(&self) -> Result<HashMap<String, SigningKey>, KeyResolutionError> {
        tracing::debug!(target: "api.auth.jwks", "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "api.auth.jwks", error = %e, "Failed to fetch JWKS");
                KeyResolutionError::FetchFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "api.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(KeyResolutionError::FetchFailed(format!(
                "unexpected status {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "api.auth.jwks", error = %e, "Failed to read JWKS response");
            KeyResolutionError::FetchFailed(e.to_string())
        })?;

        let jwks: JwksResponse = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(target: "api.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeyResolutionError::ParseFailed(e.to_string())
        })?;

        Ok(index_keys(jwks))
    }

    /// Clear the cache.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

#[async_trait]
impl KeyResolver for JwksClient {
    /// Get a signing key by key ID.
    ///
    /// Serves from cache when fresh. Refetches when the cache is stale, or
    /// when the kid is unknown and no other kid-miss refresh happened within
    /// the minimum refresh interval.
    #[instrument(skip(self), fields(kid = %kid))]
    async fn resolve(&self, kid: &str) -> Result<SigningKey, KeyResolutionError> {
        // Read before the cache so a refresh finishing in between is noticed
        let generation = self.refresh_generation.load(Ordering::Acquire);

        let lookup = self.lookup(kid).await;
        if let CacheLookup::Hit(key) = lookup {
            tracing::debug!(target: "api.auth.jwks", "JWKS cache hit");
            metrics::record_jwks_cache("hit");
            return Ok(key);
        }
        metrics::record_jwks_cache("miss");

        let mut state = self.refresh_state.lock().await;

        // Another task refreshed while we waited for the lock
        if self.refresh_generation.load(Ordering::Acquire) != generation {
            if let Some(err) = state.last_error.clone() {
                return Err(err);
            }
            return match self.lookup(kid).await {
                CacheLookup::Hit(key) => Ok(key),
                _ => Err(KeyResolutionError::KeyNotFound(kid.to_string())),
            };
        }

        if matches!(lookup, CacheLookup::Miss) {
            let recently_refreshed = state
                .last_kid_miss_refresh
                .is_some_and(|at| at.elapsed() < self.min_refresh_interval);
            if recently_refreshed {
                tracing::debug!(target: "api.auth.jwks", "Unknown kid, refresh rate limited");
                return Err(KeyResolutionError::KeyNotFound(kid.to_string()));
            }
            tracing::debug!(target: "api.auth.jwks", "Unknown kid, refreshing JWKS");
            state.last_kid_miss_refresh = Some(Instant::now());
        }

        self.refresh_locked(&mut state).await?;
        drop(state);

        match self.lookup(kid).await {
            CacheLookup::Hit(key) => Ok(key),
            _ => {
                tracing::warn!(target: "api.auth.jwks", "Key not found in JWKS after refresh");
                Err(KeyResolutionError::KeyNotFound(kid.to_string()))
            }
        }
    }
}
