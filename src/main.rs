//! seed-server
//!
//! A small HTTP application served by a master/worker process pair.
//!
//! # Architecture Overview
//!
//! ```text
//!     master process                          worker process (re-exec)
//!   ┌───────────────────────┐  descriptor 3  ┌──────────────────────────┐
//!   │ net::SharedListener   │───────────────▶│ net::listener::inherit   │
//!   │ lifecycle::Supervisor │   SIGTERM      │ http::server (axum)      │
//!   │   SIGUSR1 → reload    │───────────────▶│ routing::Router          │
//!   │   config change       │                │   global chain           │
//!   │   exit → respawn      │◀── exit ───────│   group chain → handler  │
//!   └───────────────────────┘                └──────────────────────────┘
//! ```
//!
//! Send `SIGUSR1` to the master to roll the worker without dropping
//! connections; `SIGTERM` or `SIGINT` drains and exits.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use clap::Parser;
use futures_util::future::BoxFuture;
use tracing::Instrument;

use seed_server::config::{load_config, SeedConfig};
use seed_server::http::{access_log, bearer_auth, from_fn, Context, Handler, MiddlewareRef};
use seed_server::lifecycle::Mode;
use seed_server::observability::{init_logging, process_span};
use seed_server::routing::{RouteError, Router, Routes};
use seed_server::Seed;

#[derive(Parser, Debug)]
#[command(name = "seed-server")]
#[command(about = "HTTP router with zero-downtime worker reloads", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overrides the configuration file
    #[arg(short, long)]
    bind: Option<String>,

    /// PEM certificate; serves HTTPS together with --tls-key
    #[arg(long, requires = "tls_key")]
    tls_cert: Option<String>,

    /// PEM private key
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<String>,

    /// Log level, overrides the configuration file
    #[arg(long)]
    log_level: Option<String>,

    /// Bearer token required by /api/admin routes
    #[arg(long, default_value = "change-me")]
    admin_token: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SeedConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }

    init_logging(&config.observability)?;

    let span = process_span(Mode::current());
    run(cli, config).instrument(span).await
}

async fn run(cli: Cli, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        drain_timeout_secs = config.supervisor.drain_timeout_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "seed-server v0.1.0 starting"
    );

    let router = build_router(&cli.admin_token)?;

    let mut seed = Seed::new(config, router)?;
    if let Some(path) = &cli.config {
        seed = seed.with_config_path(path);
    }

    let bind = cli.bind.as_deref();
    match (&cli.tls_cert, &cli.tls_key) {
        (Some(cert), Some(key)) => seed.run_tls(cert, key, bind).await?,
        _ => seed.run(bind).await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Reports which process answered; changes across a reload.
struct Status;

impl Handler for Status {
    fn serve<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let body = serde_json::json!({
                "pid": std::process::id(),
                "role": Mode::current().as_str(),
            });
            if let Err(e) = cx.json(StatusCode::OK, &body) {
                tracing::error!(error = %e, "Failed to encode status");
                cx.respond(StatusCode::INTERNAL_SERVER_ERROR);
            }
        })
    }
}

fn build_router(admin_token: &str) -> Result<Router, RouteError> {
    let mut router = Router::new();
    router.use_middleware([Arc::new(access_log()) as MiddlewareRef]);

    router.handle_fn("GET,HEAD", "/", |_req| async { "seed-server\n" }, &[])?;
    router.handle_std("GET", "/status", Status, &[])?;
    router.handle_fn(
        "ANY",
        "/echo/*",
        |req: Request<Body>| async move { format!("{} {}\n", req.method(), req.uri().path()) },
        &[],
    )?;

    let api_version: MiddlewareRef = Arc::new(from_fn(|cx, next| {
        Box::pin(async move {
            let reached = next.run(cx).await;
            cx.response_mut()
                .headers_mut()
                .insert("x-api-version", HeaderValue::from_static("1"));
            reached
        })
    }));
    let admin_auth: MiddlewareRef = Arc::new(bearer_auth(admin_token));

    router.group(
        "/api",
        |api| {
            api.handle_fn("GET", "/time", |_req| async { unix_time().to_string() }, &[])?;
            api.group(
                "/admin",
                |admin| admin.handle_std("GET", "/status", Status, &[]),
                &[admin_auth],
            )
        },
        &[api_version],
    )?;

    Ok(router)
}

fn unix_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
