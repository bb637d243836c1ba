//! PrepKit HTTP server
//!
//! Serves the cached weather API, the placeholder and health endpoints and
//! the static front end, and runs the cache eviction task for the lifetime
//! of the server.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{handle_rejection, ApiRejection, ErrorBody};
pub use routes::routes;
pub use state::AppState;

use anyhow::{Context, Result};
use prepkit_core::Config;
use tokio_util::sync::CancellationToken;

/// Run until Ctrl+C or SIGTERM.
pub async fn serve(config: Config) -> Result<()> {
    serve_until(config, CancellationToken::new()).await
}

/// Run until a shutdown signal arrives or `cancel` fires.
pub async fn serve_until(config: Config, cancel: CancellationToken) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let environment = config.server.environment;
    let eviction_interval = config.weather.eviction_interval();

    if !config.weather.has_api_key() {
        tracing::warn!("OpenWeather API key not configured; weather requests will fail");
    }

    let state = AppState::from_config(config).context("Failed to build weather provider")?;
    let eviction = state
        .cache
        .clone()
        .spawn_eviction(eviction_interval, cancel.clone());

    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown_signal(cancel.clone()))
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server running on http://{}", bound);
    tracing::info!("Environment: {}", environment.as_str());

    server.await;

    cancel.cancel();
    eviction.await.context("Eviction task panicked")?;
    tracing::info!("Server closed");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Shutdown signal received"),
        _ = terminate => tracing::info!("SIGTERM received. Shutting down gracefully..."),
        _ = cancel.cancelled() => tracing::info!("Shutdown requested"),
    }

    cancel.cancel();
}
