use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::models::{WeatherData, WeatherQuery};
use crate::cache::WeatherCache;
use crate::display::{format_local_time, icon_url, temperature_label, wind_label};
use crate::error::{AppError, SERVER_CONFIGURATION_ERROR};
use crate::upstream::UpstreamClient;

/// Weather is always requested in metric units
const UNITS: &str = "metric";

pub struct WeatherService {
    upstream: UpstreamClient,
    api_key: Option<String>,
    base_url: Url,
    cache: WeatherCache,
}

impl WeatherService {
    pub fn new(
        upstream: UpstreamClient,
        api_key: Option<String>,
        base_url: Url,
        cache: WeatherCache,
    ) -> Self {
        Self {
            upstream,
            api_key,
            base_url,
            cache,
        }
    }

    fn build_url(&self, query: &WeatherQuery) -> Result<Url, AppError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("OpenWeatherMap API key not configured");
            return Err(AppError::internal(SERVER_CONFIGURATION_ERROR));
        };

        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("appid", api_key);
            pairs.append_pair("units", UNITS);
            for (key, value) in query.provider_params() {
                pairs.append_pair(key, &value);
            }
        }

        Ok(url)
    }

    /// Current weather for a city or a coordinate pair.
    ///
    /// The provider body is returned as received; only "is it JSON" is
    /// checked. Successful responses are reused until the cache TTL passes.
    pub async fn get_weather(&self, query: &WeatherQuery) -> Result<Value, AppError> {
        let url = self.build_url(query)?;
        let cache_key = query.cache_key();

        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!(key = %cache_key, "Weather cache hit");
            return Ok(cached);
        }

        tracing::debug!(query = ?query, "Fetching weather data");

        let body: Value = self.upstream.get_json(url).await?;
        log_fetched(&body);

        self.cache.insert(cache_key, body.clone());

        Ok(body)
    }
}

fn log_fetched(body: &Value) {
    let weather = match WeatherData::deserialize(body) {
        Ok(weather) => weather,
        Err(e) => {
            tracing::warn!(error = %e, "Weather response has an unexpected shape; relaying it unchanged");
            return;
        }
    };

    let offset = weather.timezone.unwrap_or(0);
    let local = |ts: Option<i64>| ts.and_then(|ts| format_local_time(ts, offset));
    let sys = weather.sys.as_ref();

    tracing::info!(
        city = %weather.name,
        temp = %temperature_label(weather.main.temp),
        wind = ?weather.wind.and_then(|w| w.deg).map(wind_label),
        sunrise = ?local(sys.and_then(|s| s.sunrise)),
        sunset = ?local(sys.and_then(|s| s.sunset)),
        icon = ?weather.primary_condition().map(|c| icon_url(&c.icon)),
        "Weather data fetched successfully"
    );
}
