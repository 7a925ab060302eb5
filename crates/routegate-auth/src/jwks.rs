//! JWKS (JSON Web Key Set) signing key resolution and caching
//!
//! - **Per-key caching**: resolved keys live in a [`KeyCache`] bounded by size and TTL
//! - **Rate limiting**: discovery fetches share one window across all key identifiers
//! - **Bounded fetches**: every request to the key set endpoint carries a timeout
//! - **Lenient parsing**: keys the verifier cannot use are skipped, not fatal
//!
//! Concurrent misses for the same `kid` are coalesced: one caller fetches the key
//! set and takes a rate limit slot, the others wait for its result (key or error).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{Jwk, JwkSet, PublicKeyUse};
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{CachePolicy, FetchPolicy, VerifierConfig};
use crate::error::{ConfigError, KeyResolutionError};
use crate::rate_limit::RateLimiter;

/// A public signing key ready for signature verification
pub struct SigningKey {
    key_id: String,
    jwk: Jwk,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Build a signing key from a JWK
    ///
    /// Returns `None` for keys without a `kid`, keys published for encryption, or key
    /// material that cannot be turned into a verification key.
    pub fn from_jwk(jwk: &Jwk) -> Option<Self> {
        let key_id = jwk.common.key_id.clone()?;
        if matches!(
            jwk.common.public_key_use,
            Some(PublicKeyUse::Encryption) | Some(PublicKeyUse::Other(_))
        ) {
            return None;
        }
        let decoding_key = DecodingKey::from_jwk(jwk).ok()?;
        Some(Self {
            key_id,
            jwk: jwk.clone(),
            decoding_key,
        })
    }

    /// Key identifier (`kid`)
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The published key material
    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    /// Verification key derived from the JWK
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

// DecodingKey is opaque key material; show only the identifier
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("key_algorithm", &self.jwk.common.key_algorithm)
            .finish_non_exhaustive()
    }
}

/// Source of signing keys, looked up by key identifier
#[async_trait]
pub trait KeySource: Send + Sync + fmt::Debug {
    /// Resolve the signing key for `kid`
    ///
    /// # Errors
    ///
    /// Returns [`KeyResolutionError`] when the key cannot be obtained.
    async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, KeyResolutionError>;
}

/// The Signing Key Set: a bounded, expiring map from `kid` to key
///
/// Owned by the resolver that uses it and dropped with it. Clones share entries.
#[derive(Clone)]
pub struct KeyCache {
    entries: Cache<String, Arc<SigningKey>>,
    policy: CachePolicy,
}

impl KeyCache {
    /// Create an empty cache with the given bounds
    pub fn new(policy: &CachePolicy) -> Self {
        let entries = Cache::builder()
            .max_capacity(policy.max_entries)
            .time_to_live(policy.ttl)
            .build();
        Self {
            entries,
            policy: policy.clone(),
        }
    }

    /// Cached key for `kid`, if present and not expired
    pub async fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.entries.get(kid).await
    }

    /// Store a key under its own identifier
    pub async fn insert(&self, key: Arc<SigningKey>) {
        self.entries.insert(key.key_id.clone(), key).await;
    }

    /// Cached key for `kid`, or the result of `init` if absent
    ///
    /// Concurrent calls for the same `kid` evaluate a single `init`; the rest wait
    /// and receive its outcome. Errors are handed to the waiters but never stored.
    pub async fn get_or_try_insert<F>(
        &self,
        kid: &str,
        init: F,
    ) -> Result<Arc<SigningKey>, KeyResolutionError>
    where
        F: Future<Output = Result<Arc<SigningKey>, KeyResolutionError>>,
    {
        self.entries
            .try_get_with_by_ref(kid, init)
            .await
            .map_err(|e| e.as_ref().clone())
    }

    /// Drop every cached key
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Approximate number of cached keys
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Whether the cache currently holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounds this cache was built with
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(&CachePolicy::default())
    }
}

impl fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCache")
            .field("policy", &self.policy)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

/// Key set document as served; keys are parsed one by one so a single
/// unsupported entry does not hide the rest
#[derive(Debug, Deserialize)]
struct RawKeySet {
    keys: Vec<serde_json::Value>,
}

/// Remote key resolver backed by the authority's JWKS endpoint
///
/// # Example
///
/// ```rust,no_run
/// # use routegate_auth::{KeyResolver, KeySource, VerifierConfig};
/// # tokio_test::block_on(async {
/// let config = VerifierConfig::new("tenant.example.com", "https://api.example.com")?;
/// let resolver = KeyResolver::from_config(&config)?;
///
/// // First call fetches the key set, later calls for the same kid hit the cache
/// let key = resolver.resolve("key-id-123").await?;
/// println!("resolved {}", key.key_id());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct KeyResolver {
    jwks_uri: Url,
    http_client: reqwest::Client,
    cache: KeyCache,
    limiter: RateLimiter,
}

impl KeyResolver {
    /// Create a resolver with its own cache
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(jwks_uri: Url, fetch: &FetchPolicy, cache: &CachePolicy) -> Result<Self, ConfigError> {
        Self::with_cache(jwks_uri, fetch, KeyCache::new(cache))
    }

    /// Create a resolver around an existing cache
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn with_cache(jwks_uri: Url, fetch: &FetchPolicy, cache: KeyCache) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(fetch.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            jwks_uri,
            http_client,
            cache,
            limiter: RateLimiter::per_minute(fetch.requests_per_minute),
        })
    }

    /// Create a resolver from a verifier configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.jwks_uri().clone(),
            config.fetch_policy(),
            config.cache_policy(),
        )
    }

    /// Key set endpoint
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// The cache this resolver populates
    pub fn cache(&self) -> &KeyCache {
        &self.cache
    }

    /// The limiter guarding the endpoint
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Rate-limited discovery of `kid`, run at most once per burst of misses
    async fn discover(&self, kid: &str) -> Result<Arc<SigningKey>, KeyResolutionError> {
        if let Err(info) = self.limiter.try_acquire() {
            warn!(
                kid,
                jwks_uri = %self.jwks_uri,
                retry_after_ms = info.retry_after.as_millis() as u64,
                "JWKS fetch rate limited"
            );
            return Err(KeyResolutionError::RateLimited {
                retry_after: info.retry_after,
            });
        }

        self.fetch_and_cache(kid).await?.ok_or_else(|| {
            warn!(kid, jwks_uri = %self.jwks_uri, "Key ID not found in JWKS");
            KeyResolutionError::KeyNotFound {
                kid: kid.to_string(),
            }
        })
    }

    /// Fetch the key set and cache every usable signing key except `kid`, which is
    /// returned for the caller to store
    async fn fetch_and_cache(
        &self,
        kid: &str,
    ) -> Result<Option<Arc<SigningKey>>, KeyResolutionError> {
        info!(jwks_uri = %self.jwks_uri, "Fetching JWKS from endpoint");

        let response = self
            .http_client
            .get(self.jwks_uri.clone())
            .send()
            .await
            .map_err(|e| {
                error!(jwks_uri = %self.jwks_uri, error = %e, "Failed to fetch JWKS");
                if e.is_timeout() {
                    KeyResolutionError::Timeout
                } else {
                    KeyResolutionError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                jwks_uri = %self.jwks_uri,
                status = %status,
                "JWKS endpoint returned error status"
            );
            return Err(KeyResolutionError::Status(status.as_u16()));
        }

        let raw: RawKeySet = response.json().await.map_err(|e| {
            error!(jwks_uri = %self.jwks_uri, error = %e, "Failed to parse JWKS JSON");
            if e.is_timeout() {
                KeyResolutionError::Timeout
            } else {
                KeyResolutionError::InvalidKeySet(e.to_string())
            }
        })?;

        let published = raw.keys.len();
        let mut usable = 0usize;
        let mut requested = None;
        for value in raw.keys {
            let jwk = match serde_json::from_value::<Jwk>(value) {
                Ok(jwk) => jwk,
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable JWK");
                    continue;
                }
            };
            match SigningKey::from_jwk(&jwk) {
                Some(key) => {
                    usable += 1;
                    let key = Arc::new(key);
                    if key.key_id == kid {
                        requested = Some(key);
                    } else {
                        self.cache.insert(key).await;
                    }
                }
                None => debug!(kid = ?jwk.common.key_id, "Skipping non-signing JWK"),
            }
        }

        info!(
            jwks_uri = %self.jwks_uri,
            published,
            usable,
            "Successfully fetched JWKS"
        );

        Ok(requested)
    }
}

#[async_trait]
impl KeySource for KeyResolver {
    async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, KeyResolutionError> {
        if let Some(key) = self.cache.get(kid).await {
            debug!(kid, "Using cached signing key");
            return Ok(key);
        }

        self.cache.get_or_try_insert(kid, self.discover(kid)).await
    }
}

/// Fixed, local key set (no network)
///
/// Useful for offline deployments that pin the authority's keys, and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticKeySet {
    keys: Vec<Arc<SigningKey>>,
}

impl StaticKeySet {
    /// Build from a parsed key set, dropping keys that cannot verify signatures
    pub fn new(jwks: &JwkSet) -> Self {
        Self {
            keys: jwks
                .keys
                .iter()
                .filter_map(SigningKey::from_jwk)
                .map(Arc::new)
                .collect(),
        }
    }

    /// Number of usable keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no usable key was found
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeySource for StaticKeySet {
    async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, KeyResolutionError> {
        self.keys
            .iter()
            .find(|key| key.key_id == kid)
            .cloned()
            .ok_or_else(|| KeyResolutionError::KeyNotFound {
                kid: kid.to_string(),
            })
    }
}
