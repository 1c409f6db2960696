mod classifiers;
mod config;
mod errors;
mod extraction;
mod models;
mod reader;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::classifiers::PlatformTable;
use crate::config::Config;
use crate::extraction::Extractor;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume extractor v{}", env!("CARGO_PKG_VERSION"));

    if !cfg!(feature = "pdf") {
        warn!("Built without the `pdf` feature; PDF uploads will be refused");
    }
    if !cfg!(feature = "docx") {
        warn!("Built without the `docx` feature; DOCX uploads will be refused");
    }
    if !cfg!(feature = "doc") {
        warn!("Built without the `doc` feature; DOC uploads will be refused");
    }

    let platforms = PlatformTable::default();
    info!("Platform table loaded ({} host rules)", platforms.rules().len());

    let state = AppState::new(config.clone(), Extractor::new(platforms));
    info!(
        "Upload limit {} bytes, extraction timeout {}s",
        config.max_upload_bytes, config.extraction_timeout_secs
    );

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
