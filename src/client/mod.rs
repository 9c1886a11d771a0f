//! Client data layer: cached, coalesced access to the mediation endpoints.

pub mod api;
pub mod query;
pub mod suggestions;
pub mod weather;

pub use api::{ApiClient, MediationApi, MIN_SEARCH_LENGTH};
pub use query::{QueryCache, QueryKey, QueryOptions, QueryState};
pub use suggestions::{SuggestionQueryClient, SuggestionSearch, DEBOUNCE_DELAY};
pub use weather::WeatherQueryClient;
