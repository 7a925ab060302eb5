//! Verification configuration
//!
//! [`VerifierConfig`] is built once at startup and never mutated afterwards; the
//! verifier holds it behind an `Arc`. Reading the process environment is confined to
//! [`VerifierConfig::resolve`], which bootstrap code calls before constructing anything.

use std::time::Duration;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::ConfigError;

/// Environment variable holding the authority domain
pub const DOMAIN_ENV: &str = "AUTH0_DOMAIN";
/// Environment variable holding the expected audience
pub const AUDIENCE_ENV: &str = "AUTH0_AUDIENCE";

/// Path of the key set document on the authority
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Name of the claim carrying granted permissions
pub const DEFAULT_PERMISSIONS_CLAIM: &str = "permissions";

/// Limits applied to requests against the key discovery endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPolicy {
    /// Key set fetches allowed per minute, shared across all key identifiers
    pub requests_per_minute: u32,
    /// Upper bound for a single fetch
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            requests_per_minute: 5,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Bounds for the signing key cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Maximum number of cached keys
    pub max_entries: u64,
    /// Lifetime of a cached key
    pub ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_entries: 5,
            ttl: Duration::from_secs(600),
        }
    }
}

/// Immutable verification settings
///
/// # Example
///
/// ```rust
/// use routegate_auth::VerifierConfig;
///
/// let config = VerifierConfig::new("tenant.example.com", "https://api.example.com").unwrap();
/// assert_eq!(config.issuer(), "https://tenant.example.com/");
/// assert_eq!(
///     config.jwks_uri().as_str(),
///     "https://tenant.example.com/.well-known/jwks.json"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    issuer: String,
    audience: String,
    jwks_uri: Url,
    algorithm: Algorithm,
    leeway: Duration,
    permissions_claim: String,
    fetch: FetchPolicy,
    cache: CachePolicy,
}

impl VerifierConfig {
    /// Build a configuration for an authority domain and expected audience
    ///
    /// The issuer becomes `https://{domain}/` and keys are discovered at
    /// `https://{domain}/.well-known/jwks.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDomain`] or [`ConfigError::MissingAudience`] for
    /// blank inputs, and [`ConfigError::InvalidJwksUri`] if the domain does not form a URL.
    pub fn new(domain: impl AsRef<str>, audience: impl Into<String>) -> Result<Self, ConfigError> {
        let domain = normalize_domain(domain.as_ref()).ok_or(ConfigError::MissingDomain)?;
        let audience = audience.into();
        if audience.trim().is_empty() {
            return Err(ConfigError::MissingAudience);
        }

        let jwks_uri = parse_jwks_uri(&format!("https://{domain}{JWKS_PATH}"))?;

        Ok(Self {
            issuer: format!("https://{domain}/"),
            audience,
            jwks_uri,
            algorithm: Algorithm::RS256,
            leeway: Duration::from_secs(60),
            permissions_claim: DEFAULT_PERMISSIONS_CLAIM.to_string(),
            fetch: FetchPolicy::default(),
            cache: CachePolicy::default(),
        })
    }

    /// Resolve domain and audience, preferring explicit values over the environment
    ///
    /// This is the bootstrap adapter: explicit arguments win, then `AUTH0_DOMAIN` and
    /// `AUTH0_AUDIENCE` are consulted.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is missing from both sources or is invalid.
    pub fn resolve(
        domain: Option<String>,
        audience: Option<String>,
    ) -> Result<Self, ConfigError> {
        let domain = domain
            .filter(|d| !d.trim().is_empty())
            .or_else(|| std::env::var(DOMAIN_ENV).ok())
            .ok_or(ConfigError::MissingDomain)?;
        let audience = audience
            .filter(|a| !a.trim().is_empty())
            .or_else(|| std::env::var(AUDIENCE_ENV).ok())
            .ok_or(ConfigError::MissingAudience)?;

        Self::new(domain, audience)
    }

    /// Load the configuration from `AUTH0_DOMAIN` and `AUTH0_AUDIENCE`
    ///
    /// # Errors
    ///
    /// Returns an error if either variable is unset or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(None, None)
    }

    /// Override the key set endpoint (e.g. a mirror or a local test server)
    ///
    /// # Errors
    ///
    /// Returns an error for unparseable URIs or plain HTTP on a non-loopback host.
    pub fn with_jwks_uri(mut self, uri: impl AsRef<str>) -> Result<Self, ConfigError> {
        self.jwks_uri = parse_jwks_uri(uri.as_ref())?;
        Ok(self)
    }

    /// Override the expected issuer
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set clock skew tolerance for `exp`/`nbf`
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Read granted permissions from a different claim (e.g. `scope`)
    #[must_use]
    pub fn with_permissions_claim(mut self, claim: impl Into<String>) -> Self {
        self.permissions_claim = claim.into();
        self
    }

    /// Set the key discovery rate limit and timeout
    #[must_use]
    pub fn with_fetch_policy(mut self, fetch: FetchPolicy) -> Self {
        self.fetch = fetch;
        self
    }

    /// Set the signing key cache bounds
    #[must_use]
    pub fn with_cache_policy(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Pin a different asymmetric signature algorithm
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SymmetricAlgorithm`] for HS256/384/512.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Result<Self, ConfigError> {
        if matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::SymmetricAlgorithm(algorithm));
        }
        self.algorithm = algorithm;
        Ok(self)
    }

    /// Expected `iss` claim
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Expected `aud` claim member
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Key set endpoint
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// The single accepted signature algorithm
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Clock skew tolerance
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Claim holding granted permissions
    pub fn permissions_claim(&self) -> &str {
        &self.permissions_claim
    }

    /// Key discovery limits
    pub fn fetch_policy(&self) -> &FetchPolicy {
        &self.fetch
    }

    /// Signing key cache bounds
    pub fn cache_policy(&self) -> &CachePolicy {
        &self.cache
    }
}

fn normalize_domain(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("https://").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_jwks_uri(raw: &str) -> Result<Url, ConfigError> {
    let uri = Url::parse(raw).map_err(|e| ConfigError::InvalidJwksUri {
        uri: raw.to_string(),
        reason: e.to_string(),
    })?;

    match uri.scheme() {
        "https" => Ok(uri),
        "http" if is_loopback(&uri) => Ok(uri),
        "http" => Err(ConfigError::InsecureJwksUri(raw.to_string())),
        other => Err(ConfigError::InvalidJwksUri {
            uri: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn is_loopback(uri: &Url) -> bool {
    match uri.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
