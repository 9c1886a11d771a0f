//! Outbound calls to the weather and geocoding providers.
//!
//! Every provider call goes through [`UpstreamClient::get_json`], which owns
//! the deadline and turns transport and HTTP failures into [`AppError`]s. Each
//! failure is logged here, once, before it propagates.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::error::AppError;

/// Deadline applied when the caller does not supply one
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    deadline: Duration,
}

impl UpstreamClient {
    pub fn new(client: Client, deadline: Duration) -> Self {
        Self { client, deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// GET `url` within the configured deadline and parse the JSON body as `T`
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, AppError> {
        self.get_json_within(url, self.deadline).await
    }

    /// GET `url` within `deadline`.
    ///
    /// The request future is dropped when the deadline passes, which aborts
    /// the connection; a late response is never read.
    pub async fn get_json_within<T: DeserializeOwned>(
        &self,
        url: Url,
        deadline: Duration,
    ) -> Result<T, AppError> {
        // The query string carries the credential; keep it out of the logs
        let host = url.host_str().unwrap_or_default().to_string();
        let path = url.path().to_string();

        tracing::debug!(host = %host, path = %path, "Calling upstream provider");

        match tokio::time::timeout(deadline, self.fetch(url)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    host = %host,
                    path = %path,
                    deadline_ms = deadline.as_millis() as u64,
                    "Upstream request timed out"
                );
                Err(AppError::timeout("Request timeout"))
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        tracing::debug!(status = %status, "Received upstream response");

        let bytes = response.bytes().await.map_err(transport_error)?;
        let body: Option<Value> = serde_json::from_slice(&bytes).ok();

        if !status.is_success() {
            let message = body
                .as_ref()
                .and_then(|b| b.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Upstream request failed")
                .to_string();

            tracing::error!(status = %status, error = %message, "Upstream provider returned an error");

            return Err(AppError::external_api(message)
                .with_status(status)
                .with_details(json!({ "status": status.as_u16(), "response": body })));
        }

        let Some(body) = body else {
            tracing::error!(status = %status, "Upstream provider returned a non-JSON body");
            return Err(AppError::external_api("Malformed response from upstream provider"));
        };

        serde_json::from_value(body).map_err(|e| {
            tracing::error!(error = %e, "Upstream response did not match the expected shape");
            AppError::external_api("Malformed response from upstream provider")
        })
    }
}

fn transport_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        tracing::error!(error = %err, "Upstream request timed out");
        AppError::timeout("Request timeout")
    } else {
        tracing::error!(error = %err, "Upstream transport failure");
        AppError::network("Network error")
    }
}
