pub mod config;
pub mod error;

pub use config::{
    Config, ConfigValidationError, Environment, ServerConfig, ValidationResult, WeatherConfig,
};
pub use error::{
    AppError, ConfigError, NetworkError, ReqwestErrorExt, RusqliteErrorExt, StorageError,
    WeatherError,
};

use anyhow::Result;

/// Initialize tracing for the process.
///
/// Honors `RUST_LOG`; falls back to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("PrepKit core initialized");
    Ok(())
}
