use std::sync::Arc;
use std::time::Duration;

use super::api::MediationApi;
use super::query::{QueryCache, QueryKey, QueryOptions, QueryState};
use crate::error::AppError;
use crate::weather::{WeatherData, WeatherQuery};

/// Weather is served from cache for five minutes and retried once on failure
pub const WEATHER_QUERY_OPTIONS: QueryOptions = QueryOptions {
    stale_time: Duration::from_secs(5 * 60),
    retry: 1,
    retry_delay: Duration::from_secs(1),
};

/// Cached current-weather lookups through the mediation API
pub struct WeatherQueryClient {
    api: Arc<dyn MediationApi>,
    cache: QueryCache<QueryKey, WeatherData>,
}

impl WeatherQueryClient {
    pub fn new(api: Arc<dyn MediationApi>) -> Self {
        Self::with_options(api, WEATHER_QUERY_OPTIONS)
    }

    pub fn with_options(api: Arc<dyn MediationApi>, options: QueryOptions) -> Self {
        Self {
            api,
            cache: QueryCache::new(options),
        }
    }

    pub async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherData, AppError> {
        let api = Arc::clone(&self.api);
        let target = query.clone();

        self.cache
            .fetch(QueryKey::weather(query), move || {
                let api = Arc::clone(&api);
                let target = target.clone();
                async move { api.fetch_weather(&target).await }
            })
            .await
    }

    pub fn state(&self, query: &WeatherQuery) -> QueryState<WeatherData> {
        self.cache.state(&QueryKey::weather(query))
    }
}
