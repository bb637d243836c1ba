use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Deployment environment. Controls how much detail error responses carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::Invalid(format!("unknown environment '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Weather proxy and cache settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Listening port
    pub port: u16,

    /// Directory holding the front-end bundle (index.html, js, css)
    pub static_dir: PathBuf,

    pub environment: Environment,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: PathBuf::from("public"),
            environment: Environment::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeather API key. Usually supplied through `OPENWEATHER_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider base URL (overridable for tests and proxies)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Provider unit system
    #[serde(default = "default_units")]
    pub units: String,

    /// City used when a request does not name one
    #[serde(default = "default_city")]
    pub default_city: String,

    /// How long a snapshot stays fresh
    #[serde(default = "default_cache_duration_secs")]
    pub cache_duration_secs: u64,

    /// Period of the stale-entry sweep
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,

    /// Upstream request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_units() -> String {
    "imperial".to_string()
}

fn default_city() -> String {
    "Vero Beach".to_string()
}

fn default_cache_duration_secs() -> u64 {
    10 * 60
}

fn default_eviction_interval_secs() -> u64 {
    30 * 60
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            units: default_units(),
            default_city: default_city(),
            cache_duration_secs: default_cache_duration_secs(),
            eviction_interval_secs: default_eviction_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check if an API key is present (not blank)
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing,
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from an explicit path, writing defaults if absent.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!("No config at {}, writing defaults", config_path.display());
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Apply environment overrides.
    ///
    /// `lookup` abstracts `std::env::var` so overrides can be tested without
    /// touching the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(e) => tracing::warn!("Ignoring invalid PORT '{}': {}", port, e),
            }
        }

        if let Some(key) = lookup("OPENWEATHER_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.weather.api_key = Some(key.trim().to_string());
        }

        if let Some(env) = lookup("PREPKIT_ENV") {
            match env.parse::<Environment>() {
                Ok(parsed) => self.server.environment = parsed,
                Err(e) => tracing::warn!("Ignoring PREPKIT_ENV: {}", e),
            }
        }

        if let Some(dir) = lookup("PREPKIT_STATIC_DIR").filter(|d| !d.trim().is_empty()) {
            self.server.static_dir = PathBuf::from(dir);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.server.port == 0 {
            result.add_error("server.port", "Port cannot be 0");
        }

        if let Err(e) = self.server.socket_addr() {
            result.add_error("server.host", e.to_string());
        }

        if !self.server.static_dir.is_dir() {
            result.add_warning(
                "server.static_dir",
                format!(
                    "Static directory not found: {}",
                    self.server.static_dir.display()
                ),
            );
        }

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if !matches!(
            self.weather.units.as_str(),
            "imperial" | "metric" | "standard"
        ) {
            result.add_error(
                "weather.units",
                format!(
                    "Units must be imperial, metric or standard, got: {}",
                    self.weather.units
                ),
            );
        }

        if self.weather.default_city.trim().is_empty() {
            result.add_error("weather.default_city", "Default city cannot be empty");
        }

        if self.weather.cache_duration_secs == 0 {
            result.add_warning(
                "weather.cache_duration_secs",
                "Weather caching disabled (0 seconds)",
            );
        }

        if self.weather.eviction_interval_secs == 0 {
            result.add_error(
                "weather.eviction_interval_secs",
                "Eviction interval must be greater than 0",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                "OpenWeather API key not configured - weather lookups will fail",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("PREPKIT_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("prepkit");

        Ok(config_dir.join("config.toml"))
    }
}
