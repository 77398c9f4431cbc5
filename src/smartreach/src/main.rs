//! SmartReach — engagement-driven send-time optimization and dispatch engine.
//!
//! Main entry point that wires the directory, engagement store, scheduler,
//! and tracker, then starts the HTTP server.

use clap::Parser;
use smartreach_api::{ApiServer, AppState};
use smartreach_core::clock::SystemClock;
use smartreach_core::config::AppConfig;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "smartreach")]
#[command(about = "Engagement-driven send-time optimization for email campaigns")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "SMARTREACH__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "SMARTREACH__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Scheduler worker pool size (overrides config)
    #[arg(long, env = "SMARTREACH__SCHEDULER__MAX_WORKERS")]
    workers: Option<usize>,

    /// Skip the Prometheus exporter (API-only mode)
    #[arg(long, default_value_t = false)]
    no_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smartreach=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("SmartReach starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(workers) = cli.workers {
        config.scheduler.max_workers = workers;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        workers = config.scheduler.max_workers,
        history_scope = ?config.scheduler.history_scope,
        default_timezone = %config.window.default_timezone,
        "Configuration loaded"
    );

    let state = AppState::new(&config, Arc::new(SystemClock));
    let server = ApiServer::new(config, state);

    if !cli.no_metrics {
        server.start_metrics().await?;
    }

    server.start_http().await
}
