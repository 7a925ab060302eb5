//! Host router seam
//!
//! The registrar never owns the router. It composes a [`RouteChain`] per route and
//! hands it to whatever implements [`HostRouter`]; precedence between duplicate
//! registrations is entirely the host's business.

use std::convert::Infallible;

use axum::Router;
use axum::extract::Request;
use axum::response::Response;
use axum::routing::{get_service, post_service};
use tower::util::BoxCloneSyncService;

/// A fully composed route: gating steps followed by the caller's handler
pub type RouteChain = BoxCloneSyncService<Request, Response, Infallible>;

/// A router that accepts GET and POST registrations
pub trait HostRouter {
    /// Register `chain` for `GET path`
    fn get(&mut self, path: &str, chain: RouteChain);

    /// Register `chain` for `POST path`
    fn post(&mut self, path: &str, chain: RouteChain);
}

impl<S> HostRouter for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn get(&mut self, path: &str, chain: RouteChain) {
        let router = std::mem::take(self);
        *self = router.route(path, get_service(chain));
    }

    fn post(&mut self, path: &str, chain: RouteChain) {
        let router = std::mem::take(self);
        *self = router.route(path, post_service(chain));
    }
}
