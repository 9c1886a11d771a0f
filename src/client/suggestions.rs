use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::api::{MediationApi, MIN_SEARCH_LENGTH};
use super::query::{QueryCache, QueryKey, QueryOptions, QueryState};
use crate::error::AppError;
use crate::geo::CitySuggestion;

/// Quiet period after the last keystroke before suggestions are requested
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Suggestions for a given text do not change within a day; never retried
pub const SUGGESTION_QUERY_OPTIONS: QueryOptions = QueryOptions {
    stale_time: Duration::from_secs(24 * 60 * 60),
    retry: 0,
    retry_delay: Duration::ZERO,
};

/// Cached place suggestions through the mediation API
pub struct SuggestionQueryClient {
    api: Arc<dyn MediationApi>,
    cache: QueryCache<QueryKey, Vec<CitySuggestion>>,
}

impl SuggestionQueryClient {
    pub fn new(api: Arc<dyn MediationApi>) -> Self {
        Self {
            api,
            cache: QueryCache::new(SUGGESTION_QUERY_OPTIONS),
        }
    }

    /// Queries only run once the text is long enough
    pub fn is_enabled(text: &str) -> bool {
        text.chars().count() >= MIN_SEARCH_LENGTH
    }

    /// Suggestions for `text`; disabled queries resolve to nothing without a call
    pub async fn fetch(&self, text: &str) -> Result<Vec<CitySuggestion>, AppError> {
        if !Self::is_enabled(text) {
            return Ok(Vec::new());
        }

        let api = Arc::clone(&self.api);
        let target = text.to_string();

        self.cache
            .fetch(QueryKey::suggestions(text), move || {
                let api = Arc::clone(&api);
                let target = target.clone();
                async move { api.fetch_suggestions(&target).await }
            })
            .await
    }

    pub fn state(&self, text: &str) -> QueryState<Vec<CitySuggestion>> {
        if !Self::is_enabled(text) {
            return QueryState::Idle;
        }
        self.cache.state(&QueryKey::suggestions(text))
    }
}

/// A search box: raw keystrokes in, debounced suggestion state out
pub struct SuggestionSearch {
    input: watch::Sender<String>,
    results: watch::Receiver<QueryState<Vec<CitySuggestion>>>,
    task: JoinHandle<()>,
}

impl SuggestionSearch {
    pub fn spawn(query: Arc<SuggestionQueryClient>, delay: Duration) -> Self {
        let (input, input_rx) = watch::channel(String::new());
        let (results_tx, results) = watch::channel(QueryState::Idle);

        let task = tokio::spawn(run_search(query, input_rx, results_tx, delay));

        Self {
            input,
            results,
            task,
        }
    }

    /// Replace the current text, e.g. on every keystroke
    pub fn set_input(&self, text: impl Into<String>) {
        self.input.send_replace(text.into());
    }

    pub fn results(&self) -> watch::Receiver<QueryState<Vec<CitySuggestion>>> {
        self.results.clone()
    }

    pub fn current(&self) -> QueryState<Vec<CitySuggestion>> {
        self.results.borrow().clone()
    }
}

impl Drop for SuggestionSearch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_search(
    query: Arc<SuggestionQueryClient>,
    mut input: watch::Receiver<String>,
    results: watch::Sender<QueryState<Vec<CitySuggestion>>>,
    delay: Duration,
) {
    loop {
        if input.changed().await.is_err() {
            return;
        }

        // Every new keystroke restarts the quiet period
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => break,
                changed = input.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        let text = input.borrow_and_update().clone();
        if !SuggestionQueryClient::is_enabled(&text) {
            results.send_replace(QueryState::Idle);
            continue;
        }

        tracing::debug!(text = %text, "Requesting suggestions");
        results.send_replace(QueryState::Loading);

        let state = match query.fetch(&text).await {
            Ok(suggestions) => QueryState::Success(suggestions),
            Err(err) => QueryState::Error(err),
        };
        results.send_replace(state);
    }
}
