use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use prepkit_core::WeatherError;

/// Weather condition categories derived from the provider description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    #[default]
    Clouds,
    Rain,
    Snow,
    Thunderstorm,
    Drizzle,
    Mist,
}

impl WeatherCondition {
    /// Classify a free-text description ("light rain", "overcast clouds").
    ///
    /// First keyword match wins; unknown descriptions default to clouds.
    pub fn from_description(description: &str) -> Self {
        let lower = description.to_lowercase();
        [
            ("clear", Self::Clear),
            ("cloud", Self::Clouds),
            ("rain", Self::Rain),
            ("snow", Self::Snow),
            ("thunderstorm", Self::Thunderstorm),
            ("drizzle", Self::Drizzle),
            ("mist", Self::Mist),
        ]
        .into_iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, condition)| condition)
        .unwrap_or_default()
    }

    /// Icon name used by the front end
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::Clouds => "cloud",
            Self::Rain => "cloud-rain",
            Self::Snow => "snowflake",
            Self::Thunderstorm => "bolt",
            Self::Drizzle => "cloud-rain",
            Self::Mist => "smog",
        }
    }
}

/// A reading as delivered by the upstream provider, before it is timestamped
/// and cached.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub description: String,
    pub temperature: i64,
    pub humidity: u8,
    pub wind_speed: i64,
    pub feels_like: i64,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub icon: String,
}

/// One fetched-and-timestamped weather reading for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub city: String,
    pub description: String,
    pub temperature: i64,
    pub humidity: u8,
    pub wind_speed: i64,
    pub feels_like: i64,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub icon: String,
    #[serde(default)]
    pub alerts: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn from_reading(city: impl Into<String>, reading: WeatherReading, now: DateTime<Utc>) -> Self {
        Self {
            city: city.into(),
            description: reading.description,
            temperature: reading.temperature,
            humidity: reading.humidity,
            wind_speed: reading.wind_speed,
            feels_like: reading.feels_like,
            sunrise: reading.sunrise,
            sunset: reading.sunset,
            icon: reading.icon,
            alerts: Vec::new(),
            fetched_at: now,
        }
    }

    /// A snapshot is fresh while `now - fetched_at <= ttl`.
    ///
    /// A `fetched_at` in the future (clock stepped backwards) counts as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.fetched_at).to_std() {
            Ok(age) => age <= ttl,
            Err(_) => true,
        }
    }

    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_description(&self.description)
    }
}

/// Summary of the cache table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub size: usize,
    pub cities: Vec<String>,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}
