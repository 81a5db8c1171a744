//! shelf server entry point.
//!
//! Boots the offline cache in front of the upstream server: provisions the
//! current store, collects stale siblings, then intercepts every request.
//! Logging goes to stderr as JSON.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use anyhow::{Context, Result};
use shelf_client::{FetchClient, FetchConfig};
use shelf_core::{AppConfig, CacheDb, Engine};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(origin = %config.origin, upstream = %config.upstream, "starting shelf");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache at {}", config.db_path.display()))?;
    let client = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)?)?);
    let engine = Engine::new(config.engine_settings()?, db, client.clone()).await?;

    let report = engine.on_start().await.context("store lifecycle failed")?;
    tracing::info!(
        namespace = %report.namespace,
        provisioned = report.provisioned,
        evicted = report.evicted.len(),
        failed = report.failed.len(),
        "store ready"
    );

    let state = web::Data::new(handler::AppState::new(engine, client));

    tracing::info!(listen = %config.listen, "listening");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .default_service(web::route().to(handler::intercept))
    })
    .bind(&config.listen)?
    .run()
    .await?;

    Ok(())
}
