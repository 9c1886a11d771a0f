use url::Url;

use super::models::{CitySuggestion, MAX_SUGGESTIONS};
use crate::cache::{normalize_cache_key, GeoCache};
use crate::error::{AppError, SERVER_CONFIGURATION_ERROR};
use crate::upstream::UpstreamClient;

pub struct GeocodingService {
    upstream: UpstreamClient,
    api_key: Option<String>,
    base_url: Url,
    geo_cache: GeoCache,
}

impl GeocodingService {
    pub fn new(
        upstream: UpstreamClient,
        api_key: Option<String>,
        base_url: Url,
        geo_cache: GeoCache,
    ) -> Self {
        Self {
            upstream,
            api_key,
            base_url,
            geo_cache,
        }
    }

    fn build_url(&self, query: &str) -> Result<Url, AppError> {
        let Some(api_key) = self.api_key.as_deref() else {
            // Callers only learn that the server is misconfigured
            tracing::error!("OpenWeatherMap API key not configured");
            return Err(AppError::validation(SERVER_CONFIGURATION_ERROR));
        };

        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &MAX_SUGGESTIONS.to_string())
            .append_pair("appid", api_key);

        Ok(url)
    }

    /// Find up to [`MAX_SUGGESTIONS`] places matching `query`.
    /// Results are cached for 24 hours by default.
    pub async fn get_locations(&self, query: &str) -> Result<Vec<CitySuggestion>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            tracing::warn!("Location search without a query");
            return Err(AppError::validation("Query parameter 'q' is required"));
        }

        let url = self.build_url(query)?;
        let cache_key = normalize_cache_key(query);

        if let Some(cached) = self.geo_cache.get(&cache_key) {
            tracing::debug!(query = %query, "Geocoding cache hit");
            return Ok(cached);
        }

        tracing::debug!(query = %query, "Geocoding cache miss");

        let mut locations: Vec<CitySuggestion> = self.upstream.get_json(url).await?;
        locations.truncate(MAX_SUGGESTIONS);

        tracing::debug!(query = %query, count = locations.len(), "Geocoding lookup complete");

        self.geo_cache.insert(cache_key, locations.clone());

        Ok(locations)
    }
}
