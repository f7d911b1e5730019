// CyberGuard conversation service
// Binary entry point: load config, open the store, wire the provider chain,
// serve the HTTP API until shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use cyberguard::api::{self, AppState};
use cyberguard::auth::AdminGate;
use cyberguard::config::Config;
use cyberguard::db::Database;
use cyberguard::llm::openrouter::OpenRouterProvider;
use cyberguard::llm::orchestrator::{ChatService, Orchestrator};
use cyberguard::llm::relay::RelayProvider;
use cyberguard::telemetry::{init_telemetry, init_telemetry_with_level};

#[derive(Parser)]
#[command(name = "cyberguard", version, about = "CyberGuard conversation service")]
struct Cli {
    /// Path to the configuration file (defaults to ~/.cyberguard/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Basic telemetry before config is available
    init_telemetry();

    let config = if let Some(path) = &cli.config {
        Config::load_from_path(path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize with the config-driven level (no-op if RUST_LOG is set)
    init_telemetry_with_level(&config.core.log_level);

    tracing::info!("CyberGuard v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::new(&config.database_path()).await?;

    let attempt_timeout = Duration::from_secs(config.llm.request_timeout_secs);
    let primary = RelayProvider::new(&config.llm.relay, attempt_timeout);
    let fallback = OpenRouterProvider::from_env(config.llm.openrouter.clone(), attempt_timeout);

    let chat = ChatService::new(
        db.sessions(),
        Orchestrator::new(Box::new(primary), Box::new(fallback), attempt_timeout),
        config.llm.default_model.clone(),
    );

    let state = AppState {
        sessions: db.sessions(),
        search: db.log_search(),
        gate: Arc::new(AdminGate::new(&config.admin)),
        chat: Arc::new(chat),
    };

    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("CyberGuard backend listening on http://{}", addr);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    db.close().await?;
    Ok(())
}
