// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TaskPilot API Server
//!
//! Serves account, session and meeting-extraction endpoints.

use std::sync::Arc;
use std::time::Duration;
use taskpilot::{config::Config, db::Db, services::RateLimiter, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting TaskPilot API");

    let db = match &config.gcp_project_id {
        Some(project_id) => Db::firestore(project_id).await?,
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, using in-memory storage");
            Db::in_memory()
        }
    };

    // The sweep runs for the life of the process
    let rate_limiter = Arc::new(RateLimiter::new());
    rate_limiter
        .clone()
        .spawn_sweeper(Duration::from_secs(config.rate_limit_sweep_secs.max(1)));

    let state = AppState::new(config.clone(), db, rate_limiter)?;
    if state.analyzer.is_none() {
        tracing::warn!("GROQ_API_KEY not set, transcript extraction is disabled");
    }

    // Build router
    let app = taskpilot::routes::create_router(Arc::new(state));

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
                .add_directive("taskpilot=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
