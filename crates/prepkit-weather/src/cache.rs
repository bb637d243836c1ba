//! In-memory weather cache keyed by city name.
//!
//! A snapshot is served straight from the table while it is fresh; a miss or
//! a stale entry triggers exactly one upstream call. Concurrent misses for the
//! same city share a per-city gate, so the second caller re-checks the table
//! after the first call lands instead of calling upstream again. The table
//! lock is never held across an await.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::provider::WeatherSource;
use crate::types::{CacheStatus, WeatherError, WeatherSnapshot};

/// Default freshness window (10 minutes)
pub const CACHE_DURATION: Duration = Duration::from_secs(10 * 60);

/// Default period of the stale-entry sweep (30 minutes)
pub const EVICTION_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let step = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        let mut now = self.now.lock();
        *now += step;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub struct WeatherCache {
    source: Arc<dyn WeatherSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: RwLock<HashMap<String, WeatherSnapshot>>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl WeatherCache {
    pub fn new(source: Arc<dyn WeatherSource>, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn WeatherSource>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            ttl,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the weather for `city`, calling upstream only when the cached
    /// snapshot is missing or stale.
    ///
    /// On upstream failure the table is left untouched and the error is
    /// returned; a stale entry is never served as a fallback.
    pub async fn get_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        if let Some(snapshot) = self.fresh_entry(city) {
            tracing::debug!("Weather cache hit for {}", city);
            return Ok(snapshot);
        }

        let lease = self.lease_gate(city);
        let _guard = lease.lock().await;

        // Another caller may have refreshed the entry while we waited.
        if let Some(snapshot) = self.fresh_entry(city) {
            tracing::debug!("Weather cache filled by concurrent request for {}", city);
            return Ok(snapshot);
        }
        self.refresh(city).await
    }

    async fn refresh(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        tracing::debug!("Weather cache miss for {}, calling upstream", city);

        match self.source.fetch_current(city).await {
            Ok(reading) => {
                let snapshot = WeatherSnapshot::from_reading(city, reading, self.clock.now());
                self.entries
                    .write()
                    .insert(city.to_string(), snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                tracing::error!("Error fetching weather data for {}: {}", city, e);
                Err(e)
            }
        }
    }

    fn fresh_entry(&self, city: &str) -> Option<WeatherSnapshot> {
        let now = self.clock.now();
        self.entries
            .read()
            .get(city)
            .filter(|snapshot| snapshot.is_fresh(now, self.ttl))
            .cloned()
    }

    fn lease_gate<'a>(&'a self, city: &'a str) -> GateLease<'a> {
        let gate = self
            .in_flight
            .lock()
            .entry(city.to_string())
            .or_default()
            .clone();

        GateLease {
            cache: self,
            city,
            gate: Some(gate),
        }
    }

    /// Remove every expired snapshot. Returns the number removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, snapshot| snapshot.is_fresh(now, self.ttl));
        let removed = before - entries.len();

        if removed > 0 {
            tracing::info!("Evicted {} expired weather entries", removed);
        }
        removed
    }

    /// Unconditionally empty the table.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        tracing::info!("Weather cache cleared ({} entries)", count);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Cached city keys, sorted.
    pub fn cities(&self) -> Vec<String> {
        let mut cities: Vec<String> = self.entries.read().keys().cloned().collect();
        cities.sort();
        cities
    }

    pub fn status(&self) -> CacheStatus {
        let entries = self.entries.read();
        let mut cities: Vec<String> = entries.keys().cloned().collect();
        cities.sort();

        CacheStatus {
            size: entries.len(),
            cities,
            oldest_entry: entries.values().map(|s| s.fetched_at).min(),
            newest_entry: entries.values().map(|s| s.fetched_at).max(),
        }
    }

    /// Spawn the periodic sweep. The first sweep runs one `period` after start;
    /// the task exits when `cancel` fires.
    pub fn spawn_eviction(
        self: Arc<Self>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Weather cache eviction task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.evict_expired();
                    }
                }
            }
        })
    }
}

/// A caller's hold on a per-city gate. Dropping it, including when the
/// caller's future is cancelled, removes the gate once nobody else holds it.
struct GateLease<'a> {
    cache: &'a WeatherCache,
    city: &'a str,
    gate: Option<Arc<tokio::sync::Mutex<()>>>,
}

impl GateLease<'_> {
    async fn lock(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }
}

impl Drop for GateLease<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.cache.in_flight.lock();
        if let Some(gate) = self.gate.take() {
            // Only the map and this handle remain: nobody else is waiting.
            let last = Arc::strong_count(&gate) == 2;
            drop(gate);
            if last {
                in_flight.remove(self.city);
            }
        }
    }
}
