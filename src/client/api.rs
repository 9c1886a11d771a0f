use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{AppError, ErrorCode};
use crate::geo::CitySuggestion;
use crate::weather::{WeatherData, WeatherQuery};

pub const WEATHER_ENDPOINT: &str = "/weather";
pub const LOCATIONS_ENDPOINT: &str = "/locations";

/// Suggestion lookups below this many characters never reach the network
pub const MIN_SEARCH_LENGTH: usize = 3;

/// Default deadline of a single mediation call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The two mediation endpoints, as seen from the client
#[async_trait]
pub trait MediationApi: Send + Sync {
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<WeatherData, AppError>;

    async fn fetch_suggestions(&self, text: &str) -> Result<Vec<CitySuggestion>, AppError>;
}

/// Lenient view of the error envelope; any field may be missing
#[derive(Debug, Default, Deserialize)]
struct EnvelopeError {
    message: Option<String>,
    code: Option<String>,
    details: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    error: Option<EnvelopeError>,
}

/// Thin fetch wrapper over the mediation server
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// `base_url` is where the mediation routes are mounted, e.g. `http://localhost:3000`
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// GET `path` with `params`, failing with the server's own error classification
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);

        match tokio::time::timeout(self.timeout, self.fetch(&url, params)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(url = %url, "Request timeout");
                Err(AppError::timeout("Request timeout"))
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "API client error");
                AppError::network("Network error")
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            tracing::error!(error = %e, url = %url, "API client error");
            AppError::network("Network error")
        })?;

        if !status.is_success() {
            let envelope: Envelope = serde_json::from_slice(&bytes).unwrap_or_default();
            let error = envelope.error.unwrap_or_default();
            let code = error
                .code
                .as_deref()
                .and_then(ErrorCode::parse)
                .unwrap_or(ErrorCode::RequestFailed);

            let mut err = AppError::new(
                error.message.unwrap_or_else(|| "Request failed".to_string()),
                normalize_status(status),
                code,
            );
            if let Some(details) = error.details {
                err = err.with_details(details);
            }

            tracing::warn!(status = %status, code = %code, url = %url, "Request failed");
            return Err(err);
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(error = %e, url = %url, "Malformed response body");
            AppError::new(
                "Malformed response",
                StatusCode::BAD_GATEWAY,
                ErrorCode::RequestFailed,
            )
        })
    }
}

/// Keep non-success statuses that are not errors (e.g. 3xx) inside the 4xx/5xx range
fn normalize_status(status: StatusCode) -> StatusCode {
    if status.is_client_error() || status.is_server_error() {
        status
    } else {
        StatusCode::BAD_GATEWAY
    }
}

#[async_trait]
impl MediationApi for ApiClient {
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<WeatherData, AppError> {
        let params = match query {
            WeatherQuery::City { name } => vec![("city", name.clone())],
            WeatherQuery::Coords { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        };

        self.get_json(WEATHER_ENDPOINT, &params).await
    }

    async fn fetch_suggestions(&self, text: &str) -> Result<Vec<CitySuggestion>, AppError> {
        if text.chars().count() < MIN_SEARCH_LENGTH {
            return Ok(Vec::new());
        }

        self.get_json(LOCATIONS_ENDPOINT, &[("q", text.to_string())])
            .await
    }
}
