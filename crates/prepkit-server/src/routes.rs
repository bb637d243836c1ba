//! HTTP surface.
//!
//! `/api/*` has its own rejection handler so API failures and unknown API
//! paths answer with JSON instead of falling through to the single-page-app
//! fallback. Routes match the path before the method so an unknown path is a
//! 404 rather than a 405.

use chrono::Utc;
use serde::Deserialize;
use std::convert::Infallible;
use warp::http::header::CONTENT_TYPE;
use warp::{Filter, Rejection, Reply};

use crate::error::{handle_rejection, reject};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Every route, wrapped with error recovery and the access log.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let environment = state.config.server.environment;

    let api = warp::path("api").and(
        api_routes(state.clone()).recover(move |err| handle_rejection(err, environment)),
    );

    api.or(health(state.clone()))
        .or(static_files(&state))
        .recover(move |err| handle_rejection(err, environment))
        .with(warp::log::custom(access_log))
}

fn api_routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    weather(state.clone())
        .or(cache_clear(state.clone()))
        .or(cache_status(state))
        .or(placeholder())
}

/// GET /api/weather?city=<name>
fn weather(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("weather")
        .and(warp::get())
        .and(warp::query::<WeatherQuery>())
        .and(with_state(state))
        .and_then(get_weather)
}

async fn get_weather(query: WeatherQuery, state: AppState) -> Result<impl Reply, Rejection> {
    let city = query
        .city
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(state.config.weather.default_city.as_str());

    let snapshot = state.cache.get_weather(city).await.map_err(reject)?;
    Ok(warp::reply::json(&snapshot))
}

/// POST /api/weather/cache/clear
fn cache_clear(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("weather" / "cache" / "clear")
        .and(warp::post())
        .and(with_state(state))
        .map(|state: AppState| {
            state.cache.clear();
            warp::reply::json(&serde_json::json!({
                "message": "Cache cleared successfully",
                "timestamp": Utc::now(),
            }))
        })
}

/// GET /api/weather/cache/status
fn cache_status(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("weather" / "cache" / "status")
        .and(warp::get())
        .and(with_state(state))
        .map(|state: AppState| warp::reply::json(&state.cache.status()))
}

/// GET /api/placeholder/<width>/<height>
fn placeholder() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("placeholder" / u32 / u32)
        .and(warp::get())
        .map(|width: u32, height: u32| {
            warp::reply::with_header(placeholder_svg(width, height), CONTENT_TYPE, "image/svg+xml")
        })
}

pub fn placeholder_svg(width: u32, height: u32) -> String {
    format!(
        concat!(
            r#"<svg width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg">"#,
            r##"<rect width="100%" height="100%" fill="#e0e0e0"/>"##,
            r##"<text x="50%" y="50%" font-family="Arial" font-size="14" fill="#666" "##,
            r#"dominant-baseline="middle" text-anchor="middle">{w}x{h}</text>"#,
            "</svg>"
        ),
        w = width,
        h = height
    )
}

/// GET /health
fn health(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("health")
        .and(warp::get())
        .and(with_state(state))
        .map(|state: AppState| {
            warp::reply::json(&serde_json::json!({
                "status": "OK",
                "timestamp": Utc::now(),
                "uptimeSeconds": state.uptime().as_secs(),
                "cache": {
                    "size": state.cache.len(),
                    "keys": state.cache.cities(),
                },
            }))
        })
}

/// Static assets, with `index.html` served for any other GET.
fn static_files(state: &AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let dir = state.config.server.static_dir.clone();
    let index = dir.join("index.html");

    warp::get()
        .and(warp::fs::dir(dir))
        .or(warp::get().and(warp::fs::file(index)))
}

fn access_log(info: warp::log::Info<'_>) {
    tracing::info!(
        target: "prepkit::access",
        "{} {} {} {}ms",
        info.method(),
        info.path(),
        info.status().as_u16(),
        info.elapsed().as_millis()
    );
}
