//! HTTP API server for arix-rs
//!
//! Thin transport layer over the analysis pipeline: one liveness route and
//! one smart chat route. All behavior lives in the `arix-*` library crates;
//! this crate wires configuration into components and serves them.

pub mod config;
pub mod routes;
pub mod state;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Initialize tracing subscriber with default configuration
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load configuration, build the pipeline and serve until shutdown
pub async fn run_server() -> Result<()> {
    let config = config::AppConfig::from_env()?;
    config.validate()?;

    let state = Arc::new(state::AppState::build(&config)?);
    let app = routes::router(state);

    info!(
        port = config.port,
        model = %config.default_model,
        max_reports = config.max_reports_to_analyze,
        "AriX stock analysis server starting"
    );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
