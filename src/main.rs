// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shacharit Breakfast API Server
//!
//! Daily breakfast orders and QR check-in for the morning minyan.

use mockable::DefaultClock;
use shacharit_breakfast::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb, Store},
    services::FirebaseVerifier,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        timezone = %config.timezone,
        order_window = ?config.order_window,
        "Starting Shacharit Breakfast API"
    );

    let db: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let identity = Arc::new(FirebaseVerifier::new(&config.gcp_project_id)?);

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        identity,
        Arc::new(DefaultClock),
    ));

    // Build router
    let app = shacharit_breakfast::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shacharit_breakfast=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
