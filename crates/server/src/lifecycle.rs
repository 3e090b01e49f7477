//! Startup backend selection and shutdown handling.

use std::sync::Arc;

use stash_core::{AppConfig, CacheHandle, Error, cache::select_backend};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Select the cache backend in the background and install it on `cache`.
///
/// The server keeps accepting requests while this runs; they are forced
/// misses until the backend is installed. If no backend can be opened,
/// `fatal` is notified so the server shuts down.
pub fn spawn_selection(cache: CacheHandle, config: AppConfig, fatal: Arc<Notify>) -> JoinHandle<Result<(), Error>> {
    tokio::spawn(async move {
        let result = match select_backend(&config).await {
            Ok(backend) => cache.install(backend),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, "no cache backend available");
            fatal.notify_one();
        }
        result
    })
}

/// Resolve on Ctrl-C, SIGTERM, or a fatal startup failure.
pub async fn shutdown_signal(fatal: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
        _ = fatal.notified() => tracing::info!("startup failed, shutting down"),
    }
}

/// Flush the cache once on the way out. Failures are logged, not retried.
pub async fn persist_on_shutdown(cache: &CacheHandle) {
    match cache.persist().await {
        Ok(()) => tracing::info!(backend = ?cache.kind(), "cache persisted"),
        Err(e) => tracing::error!(error = %e, "failed to persist cache on shutdown"),
    }
}
