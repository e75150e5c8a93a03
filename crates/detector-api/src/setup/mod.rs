//! Application setup and initialization
//!
//! Startup order: validate configuration, initialize tracing, load the detection
//! model, then build the database pool, storage, services and routes.
//! [`build_app`] is the part after model loading so tests can inject their own
//! detector.

pub mod database;
pub mod detector;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use detector_core::Config;
use detector_processing::ObjectDetector;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    // A missing or broken model is fatal at startup, never per request
    let detector = detector::load_detector(&config)?;

    build_app(config, detector).await
}

/// Build state and router around an already loaded detector
pub async fn build_app(
    config: Config,
    detector: Arc<dyn ObjectDetector>,
) -> Result<(Arc<AppState>, axum::Router)> {
    let pool = database::setup_database(&config).await?;

    let state = services::initialize_services(&config, pool, detector).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
