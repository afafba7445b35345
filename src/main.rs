use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use data_api_rust::config::{AppConfig, StoreBackend};
use data_api_rust::database::DatabaseManager;
use data_api_rust::services::bootstrap;
use data_api_rust::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "data-api-rust", version, about = "REST data gateway over a document database")]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Document store backend (overrides STORE_BACKEND)
    #[arg(long)]
    backend: Option<StoreBackend>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up MONGODB_CONNECTION_STRING_KEY, MAIN_API_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Environment first, then command-line flags
    let mut config = AppConfig::from_env();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(backend) = cli.backend {
        config.database.backend = backend;
    }
    config.validate().context("invalid configuration")?;

    info!("Starting data API in {:?} mode", config.environment);

    let store = DatabaseManager::connect(&config)
        .await
        .context("failed to initialise the document store")?;
    let state = AppState::new(config, store);

    if bootstrap::ensure_master_principal(&state.users(), &state.config.security.master_api_key)
        .await
        .is_none()
    {
        warn!("Continuing without a verified master principal");
    }

    let bind_addr = state.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Data API listening on http://{}", bind_addr);

    axum::serve(listener, data_api_rust::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
