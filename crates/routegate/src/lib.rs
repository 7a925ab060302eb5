//! # Routegate - Gated Route Registration for axum
//!
//! Attach an [`AuthModule`] to an axum [`Router`](axum::Router) and register routes
//! in one of three tiers:
//!
//! - **public** - no token required
//! - **private** - a valid bearer token is required (401 otherwise)
//! - **scoped** - a valid bearer token granting every required scope (401, then 403)
//!
//! Token verification, key discovery and scope checks live in [`routegate_auth`],
//! re-exported here as [`auth`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{Extension, Router};
//! use routegate::AuthModule;
//! use routegate::auth::{Claims, VerifierConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VerifierConfig::new("tenant.example.com", "https://api.example.com")?;
//! let module = AuthModule::new(config)?;
//!
//! let mut router: Router = Router::new();
//! module
//!     .attach_to(&mut router)
//!     .define_public_get("/api/public", || async { "no token needed" })
//!     .define_private_get("/api/private", |Extension(claims): Extension<Claims>| async move {
//!         format!("hello {:?}", claims.subject)
//!     })
//!     .define_scoped_get("/api/private-scoped", ["read:messages"], || async {
//!         "scoped messages"
//!     });
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`module`] - [`AuthModule`] / [`AttachedModule`] registrar
//! - [`host`] - [`HostRouter`] seam and the [`RouteChain`] it receives
//! - [`gate`] - tower layers for verification and scope checks
//! - [`rejection`] - 401/403 responses with RFC 6750 challenges
//! - [`bearer`] - `Authorization: Bearer` extraction

pub mod bearer;
pub mod gate;
pub mod host;
pub mod module;
pub mod rejection;

#[doc(inline)]
pub use bearer::bearer_token;
#[doc(inline)]
pub use gate::{RequireScopes, RequireScopesLayer, VerifyToken, VerifyTokenLayer};
#[doc(inline)]
pub use host::{HostRouter, RouteChain};
#[doc(inline)]
pub use module::{AttachedModule, AuthModule, Tier};
#[doc(inline)]
pub use rejection::Rejection;

pub use routegate_auth as auth;
