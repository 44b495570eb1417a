//! # issuer-api — Binary Entry Point
//!
//! Reads configuration from the environment, connects the optional
//! database, applies the seed file and serves HTTP on `0.0.0.0:$PORT`.

use std::time::Duration;

use issuer_api::state::{AppConfig, AppState};
use issuer_core::Timestamp;

/// How often expired credentials are dropped from the status store.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    let port = config.port;
    tracing::debug!(?config, "configuration loaded");

    let db_pool = issuer_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = AppState::with_config(config, db_pool)?;
    if let Some(summary) = state.bootstrap().map_err(|e| {
        tracing::error!("Seed bootstrap failed: {e}");
        e
    })? {
        tracing::info!(
            contexts = summary.contexts,
            holders = summary.holders,
            attestations = summary.attestations,
            credential_definitions = summary.credential_definitions,
            "seed applied"
        );
    }

    let engine = state.engine.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            engine.purge_expired(Timestamp::now());
        }
    });

    let app = issuer_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Credential issuer listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
