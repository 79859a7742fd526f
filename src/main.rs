// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pulse-Ingest API Server
//!
//! Receives signed wearable webhooks from Terra and stores normalized
//! health metrics.

use pulse_ingest::{
    config::{Config, StoreBackend},
    db::FirestoreDb,
    services::MetricMappingTable,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        max_skew_secs = config.webhook_max_skew.map(|d| d.as_secs()),
        "Starting Pulse-Ingest API"
    );

    let db = match config.store_backend {
        StoreBackend::Firestore => FirestoreDb::new(&config.gcp_project_id).await?,
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            FirestoreDb::new_memory()
        }
    };

    // Build the mapping table once; a bad definition is a startup failure
    let mappings = MetricMappingTable::standard()?;
    tracing::info!(count = mappings.len(), "Metric mappings loaded");

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, mappings));

    // Build router
    let app = pulse_ingest::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,pulse_ingest=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
