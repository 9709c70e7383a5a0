//! early-hints-server entry point.
//!
//! Serves a directory of static files behind the early-hints middleware over
//! HTTP/1.1 connections that can emit 103 responses. Logging goes to stderr as JSON.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use early_hints_core::HintsConfig;
use early_hints_server::{EarlyHints, early_hints, serve};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "early-hints-server", version, about = "Serve a directory with HTTP 103 Early Hints")]
struct Args {
    /// Directory to serve
    #[arg(default_value = "public")]
    root: PathBuf,

    /// Address to listen on
    #[arg(short, long, env = "EARLY_HINTS_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// TOML configuration file, layered under `EARLY_HINTS_*` variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Per-instance override of `size_limit`
    #[arg(long)]
    size_limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => HintsConfig::load_from(path),
        None => HintsConfig::load(),
    }
    .context("loading configuration")?;

    let store = early_hints_core::open_store(&config).await.context("opening cache store")?;
    let mut builder = EarlyHints::builder(config).standard_contributors()?.store(store);
    if let Some(limit) = args.size_limit {
        builder = builder.size_limit(limit);
    }
    let hints = builder.build();
    let _purge = hints.spawn_purge(hints.cache().ttl().min(Duration::from_secs(600)));

    let app = Router::new()
        .fallback_service(ServeDir::new(&args.root).append_index_html_on_directories(true))
        .layer(axum::middleware::from_fn_with_state(hints, early_hints))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;

    tracing::info!(root = %args.root.display(), addr = %args.bind, "starting early-hints-server");

    serve(listener, app, shutdown_signal()).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
