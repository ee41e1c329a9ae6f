//! Kubesage server binary
//!
//! Wires configuration, storage, the classifier shim, the provider factory
//! and the orchestrator together, then serves the HTTP API.

mod api;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use kubesage_core::{KeywordClassifier, Orchestrator, SqliteStore};
use kubesage_llm::ClientFactory;
use server::config::AppConfig;
use server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kubesage", about = "Adaptive Kubernetes diagnostics assistant server")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config/kubesage.toml")]
    config: PathBuf,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kubesage=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store = match &config.database.path {
        Some(path) => SqliteStore::new(path).await,
        None => SqliteStore::new_default().await,
    }
    .context("failed to initialize database")?;
    let store = Arc::new(store);

    let factory = Arc::new(ClientFactory::new(config.llm.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        Arc::new(KeywordClassifier::new()),
        factory.clone(),
        config.orchestrator.clone(),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        orchestrator,
        store,
        factory,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(addr = %addr, version = env!("CARGO_PKG_VERSION"), "Kubesage server listening");

    axum::serve(listener, build_router(state))
        .await
        .context("server error")?;

    Ok(())
}
