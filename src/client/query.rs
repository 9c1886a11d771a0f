//! Client-side query cache.
//!
//! A [`QueryCache`] holds the last good value per [`QueryKey`] and decides
//! whether a lookup needs the network. Concurrent lookups of one key share a
//! single in-flight fetch. A fresh success replaces the cached entry
//! wholesale; a failure is recorded next to it and never evicts it.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use crate::error::AppError;
use crate::weather::WeatherQuery;

/// Longest wait between two attempts of one fetch
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Identifies one cached query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    WeatherCity(String),
    /// Coordinates as IEEE-754 bit patterns
    WeatherCoords { lat: u64, lon: u64 },
    Suggestions(String),
}

impl QueryKey {
    pub fn weather(query: &WeatherQuery) -> Self {
        match query {
            WeatherQuery::City { name } => Self::WeatherCity(name.clone()),
            // Adding 0.0 folds -0.0 into 0.0
            WeatherQuery::Coords { lat, lon } => Self::WeatherCoords {
                lat: (lat + 0.0).to_bits(),
                lon: (lon + 0.0).to_bits(),
            },
        }
    }

    /// Suggestions are keyed by the raw text, as typed
    pub fn suggestions(text: &str) -> Self {
        Self::Suggestions(text.to_string())
    }
}

/// Freshness and retry policy of one kind of query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a cached value is served without refetching
    pub stale_time: Duration,
    /// Extra attempts after a failed fetch
    pub retry: u32,
    /// Wait before the first retry; doubles for each later one
    pub retry_delay: Duration,
}

impl QueryOptions {
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}

/// What a caller should render for a query right now
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// Never requested, or disabled
    Idle,
    /// First fetch in flight, nothing cached yet
    Loading,
    Success(T),
    Error(AppError),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, AppError>>>;

struct CachedValue<V> {
    value: V,
    fetched_at: Instant,
}

struct Inner<K, V> {
    entries: DashMap<K, Arc<CachedValue<V>>>,
    errors: DashMap<K, AppError>,
    in_flight: DashMap<K, SharedFetch<V>>,
    options: QueryOptions,
}

pub struct QueryCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for QueryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(options: QueryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                errors: DashMap::new(),
                in_flight: DashMap::new(),
                options,
            }),
        }
    }

    pub fn options(&self) -> QueryOptions {
        self.inner.options
    }

    /// Last good value, fresh or not
    pub fn cached(&self, key: &K) -> Option<V> {
        self.inner.entries.get(key).map(|e| e.value.clone())
    }

    fn fresh(&self, key: &K) -> Option<V> {
        let entry = self.inner.entries.get(key)?;
        (entry.fetched_at.elapsed() < self.inner.options.stale_time).then(|| entry.value.clone())
    }

    /// Serve `key` from cache while fresh, otherwise fetch it.
    ///
    /// Callers that arrive while a fetch for `key` is outstanding wait for
    /// that fetch instead of starting their own.
    pub async fn fetch<F, Fut>(&self, key: K, fetcher: F) -> Result<V, AppError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, AppError>> + Send + 'static,
    {
        if let Some(value) = self.fresh(&key) {
            tracing::debug!(key = ?key, "Query cache hit");
            return Ok(value);
        }

        let shared = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(existing) => {
                tracing::debug!(key = ?key, "Joining in-flight query");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                // A fetch may have published between the check above and here
                if let Some(value) = self.fresh(&key) {
                    return Ok(value);
                }
                tracing::debug!(key = ?key, "Query cache miss");
                let fetch = self.start(key, fetcher);
                slot.insert(fetch.clone());
                fetch
            }
        };

        shared.await
    }

    /// The fetch runs on its own task and publishes its own outcome, so it
    /// completes once however many callers wait on it, including none.
    fn start<F, Fut>(&self, key: K, fetcher: F) -> SharedFetch<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, AppError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let key = task_key;
            let result = fetch_with_retry(&key, &fetcher, inner.options).await;

            match &result {
                Ok(value) => {
                    inner.entries.insert(
                        key.clone(),
                        Arc::new(CachedValue {
                            value: value.clone(),
                            fetched_at: Instant::now(),
                        }),
                    );
                    inner.errors.remove(&key);
                }
                Err(err) => {
                    inner.errors.insert(key.clone(), err.clone());
                }
            }
            inner.in_flight.remove(&key);

            result
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    // The task died before publishing; free the slot for the next caller
                    inner.in_flight.remove(&key);
                    tracing::error!(key = ?key, error = %e, "Query task failed");
                    Err(AppError::unexpected(format!("Query task failed: {e}")))
                }
            }
        }
        .boxed()
        .shared()
    }

    pub fn state(&self, key: &K) -> QueryState<V> {
        let cached = self.cached(key);

        if cached.is_none() && self.inner.in_flight.contains_key(key) {
            return QueryState::Loading;
        }
        if let Some(err) = self.inner.errors.get(key) {
            return QueryState::Error(err.clone());
        }
        match cached {
            Some(value) => QueryState::Success(value),
            None => QueryState::Idle,
        }
    }
}

async fn fetch_with_retry<K, V, F, Fut>(
    key: &K,
    fetcher: &F,
    options: QueryOptions,
) -> Result<V, AppError>
where
    K: std::fmt::Debug,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<V, AppError>>,
{
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < options.retry => {
                attempt += 1;
                let delay = options.backoff(attempt);
                tracing::debug!(
                    key = ?key,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying failed query"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
