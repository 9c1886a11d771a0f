pub mod handlers;
pub mod models;
mod service;

pub use models::{WeatherData, WeatherQuery, DEFAULT_CITY};
pub use service::WeatherService;
