//! # Routegate Auth - Bearer Token Verification Core
//!
//! Verifies RS256-signed bearer tokens issued by a remote authority that publishes its
//! signing keys as a JSON Web Key Set, and decides whether verified claims carry the
//! permissions a route requires.
//!
//! ## Architecture
//!
//! ```text
//! raw token ──► TokenVerifier ──► KeySource (KeyResolver: cache → rate limit → JWKS fetch)
//!                    │
//!                    ▼
//!                 Claims ──► scope::authorize(claims, required)
//! ```
//!
//! - [`config`] - Immutable [`VerifierConfig`] plus the environment adapter used at bootstrap
//! - [`jwks`] - Signing key resolution and caching ([`KeyResolver`], [`KeyCache`], [`StaticKeySet`])
//! - [`verifier`] - [`TokenVerifier`], the header → key → signature → claims pipeline
//! - [`claims`] - Decoded [`Claims`] with normalized audience and permissions
//! - [`scope`] - Pure permission containment checks
//! - [`rate_limit`] - Sliding-window limiter guarding the discovery endpoint
//! - [`error`] - Error taxonomy and wire codes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routegate_auth::{TokenVerifier, VerifierConfig, scope};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VerifierConfig::new("tenant.example.com", "https://api.example.com")?;
//! let verifier = TokenVerifier::new(config)?;
//!
//! let claims = verifier.verify("eyJhbGciOiJSUzI1NiIs...").await?;
//! if scope::authorize(&claims, &["read:items"]) {
//!     println!("{:?} may read items", claims.subject);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Standards
//!
//! - **RFC 7517** - JSON Web Key (JWK)
//! - **RFC 7519** - JSON Web Token (JWT)
//! - **RFC 8725** - JWT Best Current Practices (algorithm pinning)

pub mod claims;
pub mod config;
pub mod error;
pub mod jwks;
pub mod rate_limit;
pub mod scope;
pub mod verifier;

#[doc(inline)]
pub use claims::Claims;
#[doc(inline)]
pub use config::{CachePolicy, FetchPolicy, VerifierConfig};
#[doc(inline)]
pub use error::{ClaimMismatch, ConfigError, KeyResolutionError, MalformedToken, VerificationError};
#[doc(inline)]
pub use jwks::{KeyCache, KeyResolver, KeySource, SigningKey, StaticKeySet};
#[doc(inline)]
pub use verifier::TokenVerifier;

pub use jsonwebtoken::Algorithm;
