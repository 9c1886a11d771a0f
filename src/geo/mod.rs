pub mod handlers;
pub mod models;
mod service;

pub use models::{CitySuggestion, MAX_SUGGESTIONS};
pub use service::GeocodingService;
