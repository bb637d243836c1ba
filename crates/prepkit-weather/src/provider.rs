//! Upstream weather provider.
//!
//! `WeatherSource` is the seam the cache calls through; `OpenWeatherProvider`
//! is the production implementation backed by the OpenWeather current-weather
//! endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prepkit_core::{NetworkError, ReqwestErrorExt, WeatherConfig};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::{WeatherError, WeatherReading};

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// Anything that can produce a current reading for a city.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_current(&self, city: &str) -> Result<WeatherReading, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    weather: Vec<OwmCondition>,
    main: OwmMain,
    wind: OwmWind,
    #[serde(default)]
    sys: Option<OwmSys>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwmErrorBody {
    message: Option<String>,
}

impl OwmResponse {
    fn into_reading(self) -> Result<WeatherReading, NetworkError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| NetworkError::InvalidResponse("no weather conditions in payload".into()))?;

        let (sunrise, sunset) = match self.sys {
            Some(sys) => (
                sys.sunrise.and_then(epoch_to_utc),
                sys.sunset.and_then(epoch_to_utc),
            ),
            None => (None, None),
        };

        Ok(WeatherReading {
            description: condition.description,
            temperature: self.main.temp.round() as i64,
            humidity: self.main.humidity,
            wind_speed: self.wind.speed.round() as i64,
            feels_like: self.main.feels_like.round() as i64,
            sunrise,
            sunset,
            icon: condition.icon,
        })
    }
}

fn epoch_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// OpenWeather current-weather client
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    units: String,
}

impl OpenWeatherProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| WeatherError::UpstreamUnavailable(e.into_network_error()))?;

        Ok(Self {
            client,
            api_key: config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            units: config.units.clone(),
        })
    }

    async fn error_from_response(response: reqwest::Response) -> NetworkError {
        let status = response.status();
        let message = match response.json::<OwmErrorBody>().await {
            Ok(OwmErrorBody { message: Some(m) }) => m,
            _ => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        NetworkError::ServerError {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_current(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(WeatherError::MisconfiguredCredential)?;

        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);

        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", api_key), ("units", self.units.as_str())])
            .send()
            .await
            .map_err(|e| WeatherError::UpstreamUnavailable(e.into_network_error()))?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            tracing::warn!("Weather API error for {}: {}", city, err);
            return Err(WeatherError::UpstreamUnavailable(err));
        }

        let body: OwmResponse = response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        let reading = body.into_reading()?;
        tracing::info!("Fetched weather for {}: {}", city, reading.description);
        Ok(reading)
    }
}
