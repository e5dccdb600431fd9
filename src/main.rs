// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wellness Coach API Server
//!
//! Generates coaching summaries from daily health metrics and delivers them
//! to users over their preferred channels.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wellness_coach::{config::Config, db, services::IdentityService, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        backend = ?config.storage_backend,
        "Starting Wellness Coach API"
    );

    let store = db::open_store(&config)
        .await
        .expect("Failed to open profile store");

    let identity =
        Arc::new(IdentityService::new(&config).expect("Failed to initialize identity service"));

    let state = Arc::new(AppState::new(config.clone(), store, identity));

    if !state.completion.is_configured() {
        tracing::warn!("Completion provider API key not set; summaries will fail");
    }

    // Build router
    let app = wellness_coach::routes::create_router(state);

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

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wellness_coach=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
