//! Bearer token verification
//!
//! Each call walks `ExtractHeader → ResolveKey → CheckSignature → CheckClaims` and
//! stops at the first failure. Nothing is retried here: a rejection is terminal for
//! the request that carried the token.
//!
//! # Algorithm pinning
//!
//! Only the configured asymmetric algorithm (RS256 by default) is accepted. The
//! header's `alg` is compared before any key is looked up, so a token re-signed with
//! HS256 using the public key as a shared secret never reaches signature checking.

use std::sync::Arc;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Header, TokenData, Validation, decode, decode_header};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::claims::Claims;
use crate::config::VerifierConfig;
use crate::error::{ClaimMismatch, ConfigError, MalformedToken, VerificationError};
use crate::jwks::{KeyResolver, KeySource};

/// Verifies bearer tokens against the authority's signing keys
///
/// Shared across all in-flight requests (wrap it in an `Arc`); it holds no
/// per-request state.
///
/// # Example
///
/// ```rust,no_run
/// # use routegate_auth::{TokenVerifier, VerifierConfig};
/// # tokio_test::block_on(async {
/// let config = VerifierConfig::new("tenant.example.com", "https://api.example.com")?;
/// let verifier = TokenVerifier::new(config)?;
///
/// match verifier.verify("eyJ0eXAi...").await {
///     Ok(claims) => println!("token for {:?}", claims.subject),
///     Err(e) => println!("rejected ({}): {}", e.code(), e),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    config: Arc<VerifierConfig>,
    keys: Arc<dyn KeySource>,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier that discovers keys from the configured JWKS endpoint
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key resolver cannot be built.
    pub fn new(config: VerifierConfig) -> Result<Self, ConfigError> {
        let resolver = KeyResolver::from_config(&config)?;
        Ok(Self::with_key_source(config, Arc::new(resolver)))
    }

    /// Create a verifier over any key source (a pinned [`StaticKeySet`], a shared
    /// resolver, a test double)
    ///
    /// [`StaticKeySet`]: crate::jwks::StaticKeySet
    pub fn with_key_source(config: VerifierConfig, keys: Arc<dyn KeySource>) -> Self {
        let validation = build_validation(&config);
        Self {
            config: Arc::new(config),
            keys,
            validation,
        }
    }

    /// The configuration this verifier enforces
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The key source used for signature checks
    pub fn key_source(&self) -> &Arc<dyn KeySource> {
        &self.keys
    }

    /// Verify a raw compact JWT and return its claims
    ///
    /// # Errors
    ///
    /// - [`VerificationError::Malformed`] for empty or unparseable tokens, a missing
    ///   `kid`, or a header algorithm other than the configured one
    /// - [`VerificationError::KeyResolution`] when the signing key cannot be obtained
    /// - [`VerificationError::InvalidSignature`] when the signature does not verify
    /// - [`VerificationError::ClaimMismatch`] for wrong issuer or audience, or an
    ///   expired / not-yet-valid token
    pub async fn verify(&self, raw_token: &str) -> Result<Claims, VerificationError> {
        let result = self.verify_inner(raw_token.trim()).await;
        match &result {
            Ok(claims) => debug!(
                issuer = %self.config.issuer(),
                audience = %self.config.audience(),
                subject = ?claims.subject,
                "JWT validation successful"
            ),
            Err(e) => warn!(
                code = e.code(),
                error = %e,
                issuer = %self.config.issuer(),
                audience = %self.config.audience(),
                "JWT validation failed"
            ),
        }
        result
    }

    async fn verify_inner(&self, token: &str) -> Result<Claims, VerificationError> {
        let (header, kid) = self.extract_header(token)?;

        let key = self.keys.resolve(&kid).await?;

        let data: TokenData<Map<String, Value>> =
            decode(token, key.decoding_key(), &self.validation).map_err(map_jwt_error)?;

        debug!(kid = %kid, algorithm = ?header.alg, "Signature and claims accepted");
        Ok(Claims::from_payload(
            data.claims,
            self.config.permissions_claim(),
        ))
    }

    fn extract_header(&self, token: &str) -> Result<(Header, String), MalformedToken> {
        if token.is_empty() {
            return Err(MalformedToken::Missing);
        }

        let header =
            decode_header(token).map_err(|e| MalformedToken::Encoding(e.to_string()))?;

        if header.alg != self.config.algorithm() {
            return Err(MalformedToken::DisallowedAlgorithm {
                found: header.alg,
                expected: self.config.algorithm(),
            });
        }

        let kid = header
            .kid
            .clone()
            .filter(|kid| !kid.is_empty())
            .ok_or(MalformedToken::MissingKeyId)?;

        Ok((header, kid))
    }
}

fn build_validation(config: &VerifierConfig) -> Validation {
    let mut validation = Validation::new(config.algorithm());
    validation.set_audience(&[config.audience()]);
    validation.set_issuer(&[config.issuer()]);
    validation.set_required_spec_claims(&["exp", "iss", "aud"]);
    validation.validate_nbf = true;
    validation.leeway = config.leeway().as_secs();
    validation
}

fn map_jwt_error(error: JwtError) -> VerificationError {
    match error.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidAlgorithm => VerificationError::InvalidSignature,
        ErrorKind::ExpiredSignature => ClaimMismatch::Expired.into(),
        ErrorKind::ImmatureSignature => ClaimMismatch::NotYetValid.into(),
        ErrorKind::InvalidIssuer => ClaimMismatch::Issuer.into(),
        ErrorKind::InvalidAudience => ClaimMismatch::Audience.into(),
        ErrorKind::MissingRequiredClaim(claim) => ClaimMismatch::MissingClaim(claim.clone()).into(),
        _ => MalformedToken::Encoding(error.to_string()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::StaticKeySet;
    use jsonwebtoken::Algorithm;
    use jsonwebtoken::jwk::JwkSet;

    fn verifier() -> TokenVerifier {
        let config = VerifierConfig::new("tenant.example.com", "https://api.example.com").unwrap();
        TokenVerifier::with_key_source(config, Arc::new(StaticKeySet::new(&JwkSet { keys: vec![] })))
    }

    #[test]
    fn test_validation_rules() {
        let v = verifier();
        assert_eq!(v.validation.algorithms, vec![Algorithm::RS256]);
        assert_eq!(v.validation.leeway, 60);
        assert!(v.validation.validate_nbf);
        assert!(v.validation.validate_exp);
    }

    #[tokio::test]
    async fn test_empty_token_is_missing() {
        let err = verifier().verify("   ").await.unwrap_err();
        assert_eq!(err, VerificationError::Malformed(MalformedToken::Missing));
        assert_eq!(err.code(), "malformed_token");
    }

    #[tokio::test]
    async fn test_garbage_token_is_malformed() {
        let err = verifier().verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(
            err,
            VerificationError::Malformed(MalformedToken::Encoding(_))
        ));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            map_jwt_error(ErrorKind::InvalidSignature.into()),
            VerificationError::InvalidSignature
        );
        // Token algorithm allowed, but the resolved key belongs to another family
        assert_eq!(
            map_jwt_error(ErrorKind::InvalidAlgorithm.into()),
            VerificationError::InvalidSignature
        );
        assert_eq!(
            map_jwt_error(ErrorKind::ExpiredSignature.into()),
            VerificationError::ClaimMismatch(ClaimMismatch::Expired)
        );
        assert_eq!(
            map_jwt_error(ErrorKind::ImmatureSignature.into()),
            VerificationError::ClaimMismatch(ClaimMismatch::NotYetValid)
        );
        assert_eq!(
            map_jwt_error(ErrorKind::InvalidAudience.into()),
            VerificationError::ClaimMismatch(ClaimMismatch::Audience)
        );
        assert_eq!(
            map_jwt_error(ErrorKind::MissingRequiredClaim("iss".into()).into()),
            VerificationError::ClaimMismatch(ClaimMismatch::MissingClaim("iss".into()))
        );
        assert!(matches!(
            map_jwt_error(ErrorKind::InvalidToken.into()),
            VerificationError::Malformed(MalformedToken::Encoding(_))
        ));
    }
}
