//! Weather service for PrepKit
//!
//! Fetches current conditions from OpenWeather and keeps them in a
//! time-bounded in-memory cache keyed by city name.

pub mod cache;
pub mod provider;
pub mod types;

pub use cache::{Clock, ManualClock, SystemClock, WeatherCache, CACHE_DURATION, EVICTION_INTERVAL};
pub use provider::{OpenWeatherProvider, WeatherSource};
pub use types::*;
