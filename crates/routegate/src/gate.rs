//! Tower middleware gating routes on token verification and scopes
//!
//! [`VerifyTokenLayer`] extracts and verifies the bearer token, then stores the
//! resulting [`Claims`] in the request extensions. [`RequireScopesLayer`] reads
//! those claims back and checks them against a fixed scope list. Both answer the
//! request themselves on failure, so the inner service only ever sees requests
//! that passed.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::{Router, routing::post};
//! use routegate::{RequireScopesLayer, VerifyTokenLayer};
//! use routegate::auth::{TokenVerifier, VerifierConfig};
//! use tower::ServiceBuilder;
//!
//! # fn build() -> Result<Router, Box<dyn std::error::Error>> {
//! let config = VerifierConfig::new("tenant.example.com", "https://api.example.com")?;
//! let verifier = Arc::new(TokenVerifier::new(config)?);
//!
//! let router = Router::new().route(
//!     "/items",
//!     post(|| async { "created" }).layer(
//!         ServiceBuilder::new()
//!             .layer(VerifyTokenLayer::new(verifier))
//!             .layer(RequireScopesLayer::new(["write:items"])),
//!     ),
//! );
//! # Ok(router)
//! # }
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use http::Request;
use routegate_auth::{Claims, MalformedToken, TokenVerifier, scope};
use tower::{Layer, Service};
use tracing::debug;

use crate::bearer::bearer_token;
use crate::rejection::Rejection;

/// Layer adding bearer token verification
#[derive(Debug, Clone)]
pub struct VerifyTokenLayer {
    verifier: Arc<TokenVerifier>,
}

impl VerifyTokenLayer {
    /// Create a layer verifying tokens with `verifier`
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S> Layer<S> for VerifyTokenLayer {
    type Service = VerifyToken<S>;

    fn layer(&self, inner: S) -> Self::Service {
        VerifyToken {
            inner,
            verifier: Arc::clone(&self.verifier),
        }
    }
}

/// Service produced by [`VerifyTokenLayer`]
#[derive(Debug, Clone)]
pub struct VerifyToken<S> {
    inner: S,
    verifier: Arc<TokenVerifier>,
}

impl<S, B> Service<Request<B>> for VerifyToken<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Take the instance that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let verifier = Arc::clone(&self.verifier);

        let token = bearer_token(req.headers()).map(str::to_string);

        Box::pin(async move {
            let token = match token {
                Ok(token) => token,
                Err(e) => return Ok(Rejection::from(e).into_response()),
            };

            match verifier.verify(&token).await {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    inner.call(req).await
                }
                Err(e) => Ok(Rejection::from(e).into_response()),
            }
        })
    }
}

/// Layer requiring every listed scope to be granted
///
/// Must run after [`VerifyTokenLayer`]; a request without verified claims is
/// rejected as unauthenticated.
#[derive(Debug, Clone)]
pub struct RequireScopesLayer {
    required: Arc<[String]>,
}

impl RequireScopesLayer {
    /// Create a layer requiring `scopes`
    pub fn new<I>(scopes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            required: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// The required scopes, in registration order
    pub fn required(&self) -> &[String] {
        &self.required
    }
}

impl<S> Layer<S> for RequireScopesLayer {
    type Service = RequireScopes<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireScopes {
            inner,
            required: Arc::clone(&self.required),
        }
    }
}

/// Service produced by [`RequireScopesLayer`]
#[derive(Debug, Clone)]
pub struct RequireScopes<S> {
    inner: S,
    required: Arc<[String]>,
}

impl<S> RequireScopes<S> {
    fn check(&self, claims: Option<&Claims>) -> Result<(), Rejection> {
        let Some(claims) = claims else {
            return Err(MalformedToken::Missing.into());
        };

        if scope::authorize(claims, &self.required[..]) {
            debug!(subject = ?claims.subject, required = ?self.required, "Scope check passed");
            return Ok(());
        }

        Err(Rejection::InsufficientScope {
            missing: scope::missing_scopes(claims, &self.required[..])
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }
}

impl<S, B> Service<Request<B>> for RequireScopes<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        if let Err(rejection) = self.check(req.extensions().get::<Claims>()) {
            return Box::pin(async move { Ok(rejection.into_response()) });
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::StatusCode;
    use serde_json::{Map, json};
    use std::convert::Infallible;
    use tower::ServiceExt;
    use tower::service_fn;

    fn claims(permissions: &[&str]) -> Claims {
        let mut payload = Map::new();
        payload.insert("permissions".to_string(), json!(permissions));
        Claims::from_payload(payload, "permissions")
    }

    async fn ok(_req: Request<Body>) -> Result<Response, Infallible> {
        Ok(StatusCode::OK.into_response())
    }

    #[tokio::test]
    async fn test_scopes_granted() {
        let service = RequireScopesLayer::new(["write:items"]).layer(service_fn(ok));
        let mut req = Request::new(Body::empty());
        req.extensions_mut()
            .insert(claims(&["read:items", "write:items"]));

        let response = service.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_scopes_missing() {
        let service = RequireScopesLayer::new(["write:items"]).layer(service_fn(ok));
        let mut req = Request::new(Body::empty());
        req.extensions_mut().insert(claims(&["read:items"]));

        let response = service.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_no_claims_is_unauthenticated() {
        let service = RequireScopesLayer::new(["write:items"]).layer(service_fn(ok));
        let response = service.oneshot(Request::new(Body::empty())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_required_kept_in_order() {
        let layer = RequireScopesLayer::new(vec!["b".to_string(), "a".to_string()]);
        assert_eq!(layer.required(), ["b", "a"]);
    }
}
