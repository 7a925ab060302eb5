//! Common test utilities for integration tests
//!
//! Provides a mock authority (JWKS endpoint on a wiremock server), RSA key fixtures,
//! and token minting helpers.

#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use routegate_auth::VerifierConfig;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const TRUSTED_PEM: &str = include_str!("../fixtures/trusted.pem");
pub const TRUSTED_JWK: &str = include_str!("../fixtures/trusted.jwk.json");
pub const ROGUE_PEM: &str = include_str!("../fixtures/rogue.pem");
pub const ROGUE_JWK: &str = include_str!("../fixtures/rogue.jwk.json");

pub const TRUSTED_KID: &str = "trusted-2025";
pub const ROGUE_KID: &str = "rogue-2025";

pub const ISSUER: &str = "https://tenant.example.com/";
pub const AUDIENCE: &str = "https://api.example.com";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Current Unix time in seconds
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Parse a JWK fixture into a JSON value
pub fn jwk(fixture: &str) -> Value {
    serde_json::from_str(fixture).unwrap()
}

/// A key set document containing the given JWKs
pub fn jwks(keys: Vec<Value>) -> Value {
    json!({ "keys": keys })
}

/// Mock authority publishing a key set
pub struct MockAuthority {
    pub server: MockServer,
}

impl MockAuthority {
    /// Start an authority with no mounted routes
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Start an authority publishing only the trusted key
    pub async fn with_trusted_key() -> Self {
        let authority = Self::start().await;
        authority.mock_jwks(jwks(vec![jwk(TRUSTED_JWK)])).await;
        authority
    }

    /// Full URL of the key set endpoint
    pub fn jwks_uri(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Serve `body` as the key set
    pub async fn mock_jwks(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Serve `body` as the key set and expect exactly `calls` requests
    pub async fn mock_jwks_expect(&self, body: Value, calls: u64) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Answer the key set endpoint with an error status
    pub async fn mock_jwks_error(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string("unavailable"))
            .mount(&self.server)
            .await;
    }

    /// Verifier configuration pointing at this authority
    pub fn config(&self) -> VerifierConfig {
        VerifierConfig::new("tenant.example.com", AUDIENCE)
            .unwrap()
            .with_jwks_uri(self.jwks_uri())
            .unwrap()
    }
}

/// Standard claims accepted by [`MockAuthority::config`], valid for an hour
pub fn valid_claims(permissions: &[&str]) -> Value {
    let now = now();
    json!({
        "sub": "auth0|user-1",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 3600,
        "permissions": permissions,
    })
}

/// Sign `claims` with the PEM private key under `kid`
pub fn sign(claims: &Value, pem: &str, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Sign `claims` with the trusted key
pub fn sign_trusted(claims: &Value) -> String {
    sign(claims, TRUSTED_PEM, Some(TRUSTED_KID))
}
