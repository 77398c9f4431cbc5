//! HTTP server — routes, middleware, and the Prometheus side port.

use crate::rest::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use smartreach_core::AppConfig;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the full application router over shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Directory
        .route("/v1/organizations", post(rest::create_organization))
        .route("/v1/organizations/:id/recipients", post(rest::add_recipient))
        .route(
            "/v1/organizations/:id/autofill-start-time",
            get(rest::autofill_start_time),
        )
        .route("/v1/campaigns", post(rest::create_campaign))
        // Scheduling
        .route("/v1/campaigns/:id/schedule", post(rest::schedule_campaign))
        // Engagement tracking
        .route("/track/open", get(rest::track_open))
        .route("/track/click", get(rest::track_click))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP server and serve until shutdown.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = build_router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics exporter on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
