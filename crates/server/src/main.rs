//! stash proxy entry point.
//!
//! Boots the caching reverse proxy: loads configuration, starts serving
//! immediately, and selects the cache backend in the background.
//! Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use stash_client::{UpstreamClient, UpstreamConfig};
use stash_core::{AppConfig, CacheHandle};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod lifecycle;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let addr = config.socket_addr()?;

    let upstream = UpstreamClient::new(UpstreamConfig::from(&config)).context("building upstream client")?;
    let cache = CacheHandle::new(config.ttl());
    let fatal = Arc::new(Notify::new());

    let state = handler::AppState::new(cache.clone(), Arc::new(upstream), config.secret_params());
    let selection = lifecycle::spawn_selection(cache.clone(), config.clone(), fatal.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, upstream = %config.upstream_url, ttl_secs = config.ttl_secs, "starting stash proxy");

    axum::serve(listener, handler::router(state))
        .with_graceful_shutdown(lifecycle::shutdown_signal(fatal))
        .await?;

    if selection.is_finished() {
        selection.await?.context("selecting cache backend")?;
    } else {
        selection.abort();
    }

    lifecycle::persist_on_shutdown(&cache).await;

    Ok(())
}
