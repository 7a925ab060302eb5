//! Demo API protected by routegate
//!
//! ```text
//! AUTH0_DOMAIN=tenant.example.com AUTH0_AUDIENCE=https://api.example.com \
//!     cargo run -p routegate-demo -- -v
//!
//! curl localhost:3010/api/public
//! curl -H "Authorization: Bearer $TOKEN" localhost:3010/api/private
//! curl -H "Authorization: Bearer $TOKEN" localhost:3010/api/private-scoped
//! curl -X POST -H "Authorization: Bearer $TOKEN" localhost:3010/api/items
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::{Extension, Json, Router};
use clap::Parser;
use routegate::AuthModule;
use routegate::auth::{Claims, VerifierConfig};
use serde_json::{Value, json};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

/// Demo API with public, private, and scoped routes
#[derive(Parser, Debug)]
#[command(name = "routegate-demo", version, about)]
struct Cli {
    /// Authority domain
    #[arg(long, env = "AUTH0_DOMAIN")]
    domain: Option<String>,

    /// Expected token audience
    #[arg(long, env = "AUTH0_AUDIENCE")]
    audience: Option<String>,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3010")]
    bind: SocketAddr,

    /// Claim holding granted permissions
    #[arg(long, default_value = "permissions")]
    permissions_claim: String,

    /// Clock skew tolerated on exp/nbf, in seconds
    #[arg(long, default_value_t = 60)]
    leeway_secs: u64,

    /// Enable verbose logging (-v, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn init_tracing(&self) {
        let level = match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false);
        if self.json_logs {
            builder.json().init();
        } else {
            builder.init();
        }
    }

    fn verifier_config(&self) -> anyhow::Result<VerifierConfig> {
        let config = VerifierConfig::resolve(self.domain.clone(), self.audience.clone())
            .context("failed to resolve verifier configuration")?
            .with_permissions_claim(self.permissions_claim.clone())
            .with_leeway(Duration::from_secs(self.leeway_secs));
        Ok(config)
    }
}

fn app(module: &AuthModule) -> Router {
    let mut router: Router = Router::new();

    module
        .attach_to(&mut router)
        .define_public_get("/api/public", public)
        .define_private_get("/api/private", private)
        .define_scoped_get("/api/private-scoped", ["read:messages"], scoped)
        .define_scoped_post("/api/items", ["write:items"], create_item);

    router
}

async fn public() -> Json<Value> {
    Json(json!({
        "message": "Hello from a public endpoint! You don't need to be authenticated to see this."
    }))
}

async fn private(Extension(claims): Extension<Claims>) -> Json<Value> {
    Json(json!({
        "message": "Hello from a private endpoint! You need to be authenticated to see this.",
        "subject": claims.subject,
    }))
}

async fn scoped(Extension(claims): Extension<Claims>) -> Json<Value> {
    Json(json!({
        "message": "Hello from a private endpoint! You need to be authenticated and have a scope of read:messages to see this.",
        "permissions": claims.permissions,
    }))
}

async fn create_item(Extension(claims): Extension<Claims>) -> (axum::http::StatusCode, Json<Value>) {
    (
        axum::http::StatusCode::CREATED,
        Json(json!({ "created_by": claims.subject })),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.init_tracing();

    let config = cli.verifier_config()?;
    info!(
        issuer = %config.issuer(),
        audience = %config.audience(),
        jwks_uri = %config.jwks_uri(),
        "Verifier configured"
    );

    let module = AuthModule::new(config).context("failed to build auth module")?;
    let router = app(&module);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!(addr = %cli.bind, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "routegate-demo",
            "--domain",
            "tenant.example.com",
            "--audience",
            "https://api.example.com",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.bind.port(), 3010);

        let config = cli.verifier_config().unwrap();
        assert_eq!(config.issuer(), "https://tenant.example.com/");
        assert_eq!(config.leeway(), Duration::from_secs(60));
    }

    #[test]
    fn test_routes_register() {
        let config = VerifierConfig::new("tenant.example.com", "https://api.example.com").unwrap();
        let module = AuthModule::new(config).unwrap();
        let _router = app(&module);
    }
}
