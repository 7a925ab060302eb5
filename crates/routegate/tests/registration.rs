//! Registration forwarding and attachment

mod common;

use axum::Router;
use common::*;
use http::StatusCode;
use routegate::auth::{StaticKeySet, TokenVerifier, VerifierConfig};
use routegate::{AuthModule, HostRouter, RouteChain};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingRouter {
    registered: Vec<(&'static str, String)>,
    chains: Vec<RouteChain>,
}

impl HostRouter for RecordingRouter {
    fn get(&mut self, path: &str, chain: RouteChain) {
        self.registered.push(("GET", path.to_string()));
        self.chains.push(chain);
    }

    fn post(&mut self, path: &str, chain: RouteChain) {
        self.registered.push(("POST", path.to_string()));
        self.chains.push(chain);
    }
}

fn offline_module() -> AuthModule {
    let config = VerifierConfig::new("tenant.example.com", AUDIENCE).unwrap();
    let keys = Arc::new(StaticKeySet::default());
    AuthModule::from_verifier(TokenVerifier::with_key_source(config, keys))
}

#[test]
fn test_each_registration_forwarded_exactly_once() {
    let mut host = RecordingRouter::default();
    offline_module()
        .attach_to(&mut host)
        .define_scoped_get("/reports", ["read:reports"], || async { "reports" });

    assert_eq!(host.registered, vec![("GET", "/reports".to_string())]);
    assert_eq!(host.chains.len(), 1);
}

#[test]
fn test_duplicates_are_not_deduplicated() {
    let mut host = RecordingRouter::default();
    offline_module()
        .attach_to(&mut host)
        .define_public_post("/events", || async {})
        .define_private_post("/events", || async {});

    assert_eq!(
        host.registered,
        vec![("POST", "/events".to_string()), ("POST", "/events".to_string())]
    );
}

#[tokio::test]
async fn test_forwarded_chain_enforces_tier() {
    let mut host = RecordingRouter::default();
    offline_module()
        .attach_to(&mut host)
        .define_public_get("/open", || async { "open" })
        .define_private_get("/closed", || async { "closed" });

    let open = host.chains[0].clone();
    let response = open.oneshot(request("GET", "/open", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let closed = host.chains[1].clone();
    let response = closed.oneshot(request("GET", "/closed", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_and_post_share_a_path_on_axum() {
    let server = authority().await;
    let module = AuthModule::new(config(&server)).unwrap();
    let mut router: Router = Router::new();

    module
        .attach_to(&mut router)
        .define_public_get("/api/items", || async { "list" })
        .define_scoped_post("/api/items", ["write:items"], || async {
            StatusCode::CREATED
        });

    let response = router
        .clone()
        .oneshot(request("GET", "/api/items", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(request("POST", "/api/items", Some(&token(&["write:items"]))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[test]
fn test_reattachment_binds_new_router() {
    let mut first = RecordingRouter::default();
    let mut second = RecordingRouter::default();

    let module = offline_module();
    let attached = module.attach_to(&mut first);
    let mut attached = attached.attach_to(&mut second);
    attached.define_public_get("/late", || async {});
    drop(attached);

    assert!(first.registered.is_empty());
    assert_eq!(second.registered, vec![("GET", "/late".to_string())]);
}
