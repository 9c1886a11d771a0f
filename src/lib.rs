pub mod cache;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod geo;
pub mod openapi;
pub mod routes;
pub mod upstream;
pub mod weather;

use reqwest::Client;
use std::sync::Arc;
use url::Url;

use crate::cache::{create_geo_cache, create_weather_cache, GeoCache, WeatherCache};
use crate::config::AppConfig;
use crate::error::ErrorBoundary;
use crate::geo::GeocodingService;
use crate::upstream::UpstreamClient;
use crate::weather::WeatherService;

#[derive(Clone)]
pub struct AppState {
    pub weather_service: Arc<WeatherService>,
    pub geo_service: Arc<GeocodingService>,
    pub weather_cache: WeatherCache,
    pub geo_cache: GeoCache,
    pub boundary: ErrorBoundary,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build every service once; handlers share them through the state
    pub fn from_config(config: AppConfig, http_client: Client) -> Result<Self, url::ParseError> {
        let upstream = UpstreamClient::new(http_client, config.upstream_timeout());
        let weather_cache = create_weather_cache(config.weather_cache_ttl());
        let geo_cache = create_geo_cache(config.geo_cache_ttl());

        let weather_service = Arc::new(WeatherService::new(
            upstream.clone(),
            config.openweathermap_api_key.clone(),
            Url::parse(&config.weather_base_url)?,
            Arc::clone(&weather_cache),
        ));
        let geo_service = Arc::new(GeocodingService::new(
            upstream,
            config.openweathermap_api_key.clone(),
            Url::parse(&config.geo_base_url)?,
            Arc::clone(&geo_cache),
        ));

        Ok(Self {
            weather_service,
            geo_service,
            weather_cache,
            geo_cache,
            boundary: ErrorBoundary::new(config.environment),
            config: Arc::new(config),
        })
    }
}
