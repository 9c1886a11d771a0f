use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::cache::normalize_cache_key;

/// Shown until geolocation resolves, and when it fails
pub const DEFAULT_CITY: &str = "Bengaluru";

// ============================================================================
// Lookup target
// ============================================================================

/// What to look up: a city by name, or a point by coordinates. Never both.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    City { name: String },
    Coords { lat: f64, lon: f64 },
}

impl WeatherQuery {
    pub fn city(name: impl Into<String>) -> Self {
        Self::City { name: name.into() }
    }

    pub fn coords(lat: f64, lon: f64) -> Self {
        Self::Coords { lat, lon }
    }

    /// Turn a geolocation outcome into a query, falling back to [`DEFAULT_CITY`]
    pub fn from_geolocation(position: Option<(f64, f64)>) -> Self {
        match position {
            Some((lat, lon)) => Self::coords(lat, lon),
            None => Self::city(DEFAULT_CITY),
        }
    }

    /// Provider query parameters, without the credential
    pub fn provider_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::City { name } => vec![("q", name.clone())],
            Self::Coords { lat, lon } => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
        }
    }

    /// Server-side cache key; city names are case and whitespace insensitive
    pub fn cache_key(&self) -> String {
        match self {
            Self::City { name } => format!("city:{}", normalize_cache_key(name)),
            Self::Coords { lat, lon } => format!("coords:{lat},{lon}"),
        }
    }
}

// ============================================================================
// Typed view of a Current Weather API response
// The server relays the provider body as-is; this view is what the client
// layer and the display helpers read. Only name, coord, core temperatures and
// the condition list are required.
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeatherData {
    pub name: String,
    pub coord: Coordinates,
    pub main: MainMetrics,
    pub weather: Vec<WeatherCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clouds: Option<Clouds>,
    /// Visibility in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys: Option<SysInfo>,
    /// Observation time, epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt: Option<i64>,
    /// Offset from UTC in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i32>,
}

impl WeatherData {
    pub fn country(&self) -> Option<&str> {
        self.sys.as_ref().and_then(|s| s.country.as_deref())
    }

    /// The primary condition; the provider lists the most significant first
    pub fn primary_condition(&self) -> Option<&WeatherCondition> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MainMetrics {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// hPa
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<u32>,
    /// Percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sea_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grnd_level: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeatherCondition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Wind {
    pub speed: f64,
    /// Meteorological degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deg: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Clouds {
    /// Cloud coverage, percent
    pub all: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SysInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset: Option<i64>,
}
