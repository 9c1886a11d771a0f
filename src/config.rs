use std::time::Duration;

use config::{Case, Config, ConfigError, Environment as EnvSource, File};
use serde::Deserialize;

/// Deployment context; decides how much fault detail reaches callers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// OpenWeatherMap API key. Requests fail with a configuration error when unset.
    #[serde(default)]
    pub openweathermap_api_key: Option<String>,

    /// Current weather endpoint of the provider
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,

    /// Direct geocoding endpoint of the provider
    #[serde(default = "default_geo_base_url")]
    pub geo_base_url: String,

    /// Deadline for a single provider call
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Deadline for a whole inbound request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub environment: Environment,

    /// Provider response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Seconds a weather response is reused
    #[serde(default = "default_weather_ttl_secs")]
    pub weather_ttl_secs: u64,

    /// Seconds a geocoding response is reused
    #[serde(default = "default_geo_ttl_secs")]
    pub geo_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            weather_ttl_secs: default_weather_ttl_secs(),
            geo_ttl_secs: default_geo_ttl_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_geo_base_url() -> String {
    "https://api.openweathermap.org/geo/1.0/direct".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_weather_ttl_secs() -> u64 {
    5 * 60
}

fn default_geo_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            .set_default("weather_base_url", default_weather_base_url())?
            .set_default("geo_base_url", default_geo_base_url())?
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            // Override with environment variables (prefixed with SKYCAST_)
            .add_source(
                EnvSource::with_prefix("SKYCAST")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = config.try_deserialize()?;
        // An empty key is as good as no key
        config.openweathermap_api_key = config
            .openweathermap_api_key
            .filter(|key| !key.trim().is_empty());

        Ok(config)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn weather_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.weather_ttl_secs)
    }

    pub fn geo_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.geo_ttl_secs)
    }
}
