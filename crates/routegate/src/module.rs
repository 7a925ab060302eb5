//! Route registrar: public, private, and scoped routes
//!
//! Registration is a two-phase affair. An [`AuthModule`] holds the verifier and
//! nothing else; only after [`AuthModule::attach_to`] binds it to a host router do
//! the registration methods exist, on the returned [`AttachedModule`]:
//!
//! ```rust,no_run
//! use axum::Router;
//! use routegate::AuthModule;
//! use routegate::auth::VerifierConfig;
//!
//! # fn build() -> Result<Router, Box<dyn std::error::Error>> {
//! let module = AuthModule::new(VerifierConfig::from_env()?)?;
//! let mut router: Router = Router::new();
//!
//! module
//!     .attach_to(&mut router)
//!     .define_public_get("/api/public", || async { "hello" })
//!     .define_private_get("/api/private", || async { "hello, authenticated" })
//!     .define_scoped_post("/api/items", ["write:items"], || async { "created" });
//! # Ok(router)
//! # }
//! ```
//!
//! Registering on an unattached module is rejected by the compiler:
//!
//! ```rust,compile_fail
//! use routegate::AuthModule;
//!
//! fn register(module: &AuthModule) {
//!     module.define_public_get("/health", || async { "ok" });
//! }
//! ```
//!
//! Every chain is built as `[verify token?] → [require scopes?] → handler`:
//!
//! | Tier    | Verification | Scope check | Failure            |
//! |---------|--------------|-------------|--------------------|
//! | public  | -            | -           | -                  |
//! | private | yes          | -           | 401                |
//! | scoped  | yes          | yes         | 401, then 403      |

use std::fmt;
use std::sync::Arc;

use axum::handler::Handler;
use routegate_auth::{ConfigError, TokenVerifier, VerifierConfig};
use tower::ServiceBuilder;
use tracing::info;

use crate::gate::{RequireScopesLayer, VerifyTokenLayer};
use crate::host::{HostRouter, RouteChain};

/// Unattached registrar
///
/// Cheap to clone; clones share the verifier and therefore its key cache.
#[derive(Debug, Clone)]
pub struct AuthModule {
    verifier: Arc<TokenVerifier>,
}

impl AuthModule {
    /// Build a module with a verifier for `config`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the verifier cannot be built.
    pub fn new(config: VerifierConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_verifier(TokenVerifier::new(config)?))
    }

    /// Build a module around an existing verifier
    pub fn from_verifier(verifier: impl Into<Arc<TokenVerifier>>) -> Self {
        Self {
            verifier: verifier.into(),
        }
    }

    /// The verifier used by private and scoped routes
    pub fn verifier(&self) -> &Arc<TokenVerifier> {
        &self.verifier
    }

    /// Bind to `router`, unlocking route registration
    pub fn attach_to<'r, R: HostRouter>(&self, router: &'r mut R) -> AttachedModule<'r, R> {
        AttachedModule {
            module: self.clone(),
            router,
        }
    }
}

/// Access tier of a registered route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tier {
    /// No token required
    Public,
    /// A valid token is required
    Private,
    /// A valid token granting every listed scope is required
    Scoped(Arc<[String]>),
}

impl Tier {
    fn name(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Scoped(_) => "scoped",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RouteMethod {
    Get,
    Post,
}

/// Registrar bound to a host router
///
/// Each `define_*` call forwards exactly one registration to the router. Calls
/// chain, and the same method and path may be registered more than once.
pub struct AttachedModule<'r, R> {
    module: AuthModule,
    router: &'r mut R,
}

impl<'r, R: HostRouter> AttachedModule<'r, R> {
    /// Rebind to another router, releasing the current one
    pub fn attach_to<'n, R2: HostRouter>(self, router: &'n mut R2) -> AttachedModule<'n, R2> {
        AttachedModule {
            module: self.module,
            router,
        }
    }

    /// Release the router and return the unattached module
    pub fn detach(self) -> AuthModule {
        self.module
    }

    /// The underlying module
    pub fn module(&self) -> &AuthModule {
        &self.module
    }

    /// `GET path` with no token required
    pub fn define_public_get<H, T>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.define(RouteMethod::Get, path, Tier::Public, handler)
    }

    /// `POST path` with no token required
    pub fn define_public_post<H, T>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.define(RouteMethod::Post, path, Tier::Public, handler)
    }

    /// `GET path` requiring a valid token
    pub fn define_private_get<H, T>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.define(RouteMethod::Get, path, Tier::Private, handler)
    }

    /// `POST path` requiring a valid token
    pub fn define_private_post<H, T>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.define(RouteMethod::Post, path, Tier::Private, handler)
    }

    /// `GET path` requiring a valid token granting every scope in `scopes`
    pub fn define_scoped_get<H, T, I>(&mut self, path: &str, scopes: I, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let tier = Tier::Scoped(scopes.into_iter().map(Into::into).collect());
        self.define(RouteMethod::Get, path, tier, handler)
    }

    /// `POST path` requiring a valid token granting every scope in `scopes`
    pub fn define_scoped_post<H, T, I>(&mut self, path: &str, scopes: I, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let tier = Tier::Scoped(scopes.into_iter().map(Into::into).collect());
        self.define(RouteMethod::Post, path, tier, handler)
    }

    fn define<H, T>(&mut self, method: RouteMethod, path: &str, tier: Tier, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let chain = compose(&self.module.verifier, &tier, handler);

        let scopes: &[String] = match &tier {
            Tier::Scoped(scopes) => scopes,
            _ => &[],
        };
        info!(
            method = ?method,
            path,
            tier = tier.name(),
            scopes = ?scopes,
            "Registering route"
        );

        match method {
            RouteMethod::Get => self.router.get(path, chain),
            RouteMethod::Post => self.router.post(path, chain),
        }
        self
    }
}

impl<R> fmt::Debug for AttachedModule<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedModule")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// Build the request chain for `tier` ending in `handler`
pub fn compose<H, T>(verifier: &Arc<TokenVerifier>, tier: &Tier, handler: H) -> RouteChain
where
    H: Handler<T, ()>,
    T: 'static,
{
    let endpoint = handler.with_state(());
    match tier {
        Tier::Public => RouteChain::new(endpoint),
        Tier::Private => RouteChain::new(
            ServiceBuilder::new()
                .layer(VerifyTokenLayer::new(Arc::clone(verifier)))
                .service(endpoint),
        ),
        Tier::Scoped(scopes) => RouteChain::new(
            ServiceBuilder::new()
                .layer(VerifyTokenLayer::new(Arc::clone(verifier)))
                .layer(RequireScopesLayer::new(scopes.iter().cloned()))
                .service(endpoint),
        ),
    }
}
