//! Error taxonomy for key resolution and token verification
//!
//! Every verification failure maps to exactly one wire code (see
//! [`VerificationError::code`]). Key-resolution failures share the generic
//! `invalid_token` code so clients get no signal about the authority's health.

use std::time::Duration;

use jsonwebtoken::Algorithm;

/// Configuration errors raised while building a verifier
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No authority domain given explicitly or via `AUTH0_DOMAIN`
    #[error("authority domain is not configured (pass it explicitly or set AUTH0_DOMAIN)")]
    MissingDomain,
    /// No audience given explicitly or via `AUTH0_AUDIENCE`
    #[error("audience is not configured (pass it explicitly or set AUTH0_AUDIENCE)")]
    MissingAudience,
    /// The JWKS URI could not be parsed
    #[error("invalid JWKS URI '{uri}': {reason}")]
    InvalidJwksUri {
        /// The rejected URI
        uri: String,
        /// Parser message
        reason: String,
    },
    /// The JWKS URI is plain HTTP on a non-loopback host
    #[error("JWKS endpoint must use HTTPS (HTTP only allowed for loopback hosts): {0}")]
    InsecureJwksUri(String),
    /// A shared-secret algorithm was configured
    #[error("algorithm {0:?} is symmetric; only asymmetric algorithms may verify bearer tokens")]
    SymmetricAlgorithm(Algorithm),
    /// The HTTP client for key discovery could not be built
    #[error("failed to build key discovery client: {0}")]
    HttpClient(String),
}

/// Failures while resolving a signing key from the key set endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyResolutionError {
    /// The fetched key set has no usable signing key with this identifier
    #[error("signing key '{kid}' not found in key set")]
    KeyNotFound {
        /// Requested key identifier
        kid: String,
    },
    /// The discovery request exceeded its timeout
    #[error("key set request timed out")]
    Timeout,
    /// The discovery endpoint answered with a non-success status
    #[error("key set endpoint returned status {0}")]
    Status(u16),
    /// Connection-level failure
    #[error("key set request failed: {0}")]
    Transport(String),
    /// The response body is not a JSON Web Key Set
    #[error("invalid key set document: {0}")]
    InvalidKeySet(String),
    /// The shared fetch budget is exhausted
    #[error("key set fetch rate limit exceeded, retry after {retry_after:?}")]
    RateLimited {
        /// Time until the oldest fetch leaves the window
        retry_after: Duration,
    },
}

/// Why a token could not even be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedToken {
    /// No token was presented
    #[error("no bearer token presented")]
    Missing,
    /// The Authorization header is not of the form `Bearer <token>`
    #[error("authorization header must be 'Bearer <token>'")]
    InvalidHeader,
    /// The token is not a well-formed compact JWS
    #[error("token is not well-formed: {0}")]
    Encoding(String),
    /// The header carries no `kid`
    #[error("token header has no key identifier")]
    MissingKeyId,
    /// The header declares an algorithm other than the configured one
    #[error("token algorithm {found:?} is not allowed (expected {expected:?})")]
    DisallowedAlgorithm {
        /// Algorithm from the token header
        found: Algorithm,
        /// Configured algorithm
        expected: Algorithm,
    },
}

/// A registered claim did not match the verifier's expectations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimMismatch {
    /// `iss` differs from the configured issuer
    #[error("issuer does not match")]
    Issuer,
    /// `aud` does not include the configured audience
    #[error("audience does not match")]
    Audience,
    /// `exp` is in the past
    #[error("token has expired")]
    Expired,
    /// `nbf` is in the future
    #[error("token is not yet valid")]
    NotYetValid,
    /// A required registered claim is absent
    #[error("required claim '{0}' is missing")]
    MissingClaim(String),
}

/// Terminal outcome of a rejected verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// The token is absent or cannot be parsed
    #[error(transparent)]
    Malformed(#[from] MalformedToken),
    /// The signing key could not be obtained
    #[error(transparent)]
    KeyResolution(#[from] KeyResolutionError),
    /// The signature does not verify against the resolved key
    #[error("token signature is invalid")]
    InvalidSignature,
    /// Issuer, audience or time-based claims were rejected
    #[error(transparent)]
    ClaimMismatch(#[from] ClaimMismatch),
}

impl VerificationError {
    /// Machine-readable code carried on the rejection response
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_token",
            Self::KeyResolution(_) => "invalid_token",
            Self::InvalidSignature => "invalid_signature",
            Self::ClaimMismatch(ClaimMismatch::Expired) => "expired_token",
            Self::ClaimMismatch(_) => "invalid_claims",
        }
    }

    /// Whether the failure came from the key discovery side rather than the token
    pub fn is_key_resolution(&self) -> bool {
        matches!(self, Self::KeyResolution(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(
            VerificationError::from(MalformedToken::Missing).code(),
            "malformed_token"
        );
        assert_eq!(VerificationError::InvalidSignature.code(), "invalid_signature");
        assert_eq!(
            VerificationError::from(ClaimMismatch::Expired).code(),
            "expired_token"
        );
        assert_eq!(
            VerificationError::from(ClaimMismatch::Audience).code(),
            "invalid_claims"
        );
        assert_eq!(
            VerificationError::from(KeyResolutionError::Status(503)).code(),
            "invalid_token"
        );
    }

    #[test]
    fn test_key_resolution_is_not_distinguished_by_code() {
        let not_found = VerificationError::from(KeyResolutionError::KeyNotFound {
            kid: "k1".into(),
        });
        let timeout = VerificationError::from(KeyResolutionError::Timeout);
        assert_eq!(not_found.code(), timeout.code());
        assert!(not_found.is_key_resolution());
        assert!(!VerificationError::InvalidSignature.is_key_resolution());
    }

    #[test]
    fn test_transparent_display() {
        let err = VerificationError::from(MalformedToken::MissingKeyId);
        assert_eq!(err.to_string(), "token header has no key identifier");
    }
}
