//! Application setup and initialization

pub mod database;
pub mod redirect;
pub mod routes;
pub mod server;
pub mod services;
pub mod tls;

use crate::state::AppState;
use anyhow::{Context, Result};
use mediagate_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: &Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        tls = config.tls().is_some(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(config).await?;
    let state = services::initialize_services(config, pool)?;
    let router = routes::setup_routes(config, state.clone())?;

    Ok((state, router))
}
