//! Shared fixtures for registrar integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use routegate::auth::VerifierConfig;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const TRUSTED_PEM: &str = include_str!("../../../routegate-auth/tests/fixtures/trusted.pem");
pub const TRUSTED_JWK: &str =
    include_str!("../../../routegate-auth/tests/fixtures/trusted.jwk.json");
pub const TRUSTED_KID: &str = "trusted-2025";

pub const AUDIENCE: &str = "https://api.example.com";
pub const ISSUER: &str = "https://tenant.example.com/";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Mock authority serving the trusted key set
pub async fn authority() -> MockServer {
    let server = MockServer::start().await;
    mount_jwks(&server).await;
    server
}

/// Serve the trusted key set on `server`
pub async fn mount_jwks(server: &MockServer) {
    let jwk: Value = serde_json::from_str(TRUSTED_JWK).unwrap();
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [jwk] })))
        .mount(server)
        .await;
}

/// Verifier configuration pointing at `server`
pub fn config(server: &MockServer) -> VerifierConfig {
    VerifierConfig::new("tenant.example.com", AUDIENCE)
        .unwrap()
        .with_jwks_uri(format!("{}{}", server.uri(), JWKS_PATH))
        .unwrap()
}

/// A token signed by the trusted key granting `permissions`
pub fn token(permissions: &[&str]) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = json!({
        "sub": "auth0|user-1",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 3600,
        "permissions": permissions,
    });

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TRUSTED_KID.to_string());
    let key = EncodingKey::from_rsa_pem(TRUSTED_PEM.as_bytes()).unwrap();
    encode(&header, &claims, &key).unwrap()
}

/// Build a request with an optional bearer token
pub fn request(method: &str, uri: &str, bearer: Option<&str>) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Read a response body as JSON
pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Counts handler invocations
#[derive(Debug, Clone, Default)]
pub struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
