use prepkit_core::Config;
use prepkit_weather::{OpenWeatherProvider, WeatherCache, WeatherError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<WeatherCache>,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, cache: Arc<WeatherCache>) -> Self {
        Self {
            config,
            cache,
            started_at: Instant::now(),
        }
    }

    /// Build the production cache on top of OpenWeather.
    pub fn from_config(config: Config) -> Result<Self, WeatherError> {
        let provider = OpenWeatherProvider::new(&config.weather)?;
        let cache = WeatherCache::new(Arc::new(provider), config.weather.cache_duration());
        Ok(Self::new(Arc::new(config), Arc::new(cache)))
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
