//! Error types shared across the workspace.
//!
//! `Display` carries the detailed message for logs and development
//! responses. `user_message()` is the generic text that is safe to show.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Weather lookup failed: {0}")]
    Weather(#[from] WeatherError),

    #[error("Checklist storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Bad configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Weather(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(_) => "The server is misconfigured",
            AppError::Other(_) => "An error occurred",
        }
    }
}

/// Failure talking to the upstream weather provider.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Could not reach upstream: {0}")]
    ConnectionFailed(String),

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream responded {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Unreadable upstream payload: {0}")]
    InvalidResponse(String),
}

/// Checklist persistence failures.
///
/// Read-side variants are recovered on load; a write failure is surfaced to
/// the caller while the in-memory change is kept.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read stored data: {0}")]
    ReadFailure(String),

    #[error("Stored data is corrupted: {0}")]
    Corrupted(String),

    #[error("Failed to save data: {0}")]
    WriteFailure(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::ReadFailure(_) | StorageError::Corrupted(_) => {
                "Error loading saved data"
            }
            StorageError::WriteFailure(_) => "Error saving progress",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot parse config file: {0}")]
    Parse(String),

    #[error("{0}")]
    Invalid(String),
}

/// Both variants are the same failure class to a caller: no reading could be
/// produced.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather provider unavailable: {0}")]
    UpstreamUnavailable(#[from] NetworkError),

    #[error("OpenWeather API key not configured")]
    MisconfiguredCredential,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::UpstreamUnavailable(_) => "Failed to fetch weather data",
            WeatherError::MisconfiguredCredential => {
                "Weather service unavailable. Please try again later."
            }
        }
    }
}

/// Classify a reqwest failure.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            return NetworkError::Timeout;
        }
        if self.is_decode() || self.is_body() {
            return NetworkError::InvalidResponse(self.to_string());
        }
        match self.status() {
            Some(status) => NetworkError::ServerError {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown error").to_string(),
            },
            None => NetworkError::ConnectionFailed(self.to_string()),
        }
    }
}

/// Map rusqlite failures onto the read/write side they happened on.
pub trait RusqliteErrorExt {
    fn into_read_error(self) -> StorageError;
    fn into_write_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_read_error(self) -> StorageError {
        match &self {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::DatabaseCorrupt
                    || e.code == rusqlite::ErrorCode::NotADatabase =>
            {
                StorageError::Corrupted(self.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
                StorageError::Corrupted(self.to_string())
            }
            _ => StorageError::ReadFailure(self.to_string()),
        }
    }

    fn into_write_error(self) -> StorageError {
        StorageError::WriteFailure(self.to_string())
    }
}
