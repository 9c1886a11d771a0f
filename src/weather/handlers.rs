use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::models::{WeatherData, WeatherQuery};
use crate::error::{AppError, ErrorResponse, Rejection};
use crate::AppState;

/// Raw query string of `GET /weather`; validated by [`WeatherParams::into_query`]
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherParams {
    /// City name to get weather for
    pub city: Option<String>,
    /// Latitude; used together with `lon` and preferred over `city`
    pub lat: Option<String>,
    /// Longitude; used together with `lat` and preferred over `city`
    pub lon: Option<String>,
}

impl WeatherParams {
    /// Coordinates win when both are given; otherwise fall back to the city
    pub fn into_query(self) -> Result<WeatherQuery, AppError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        if present(&self.lat) && present(&self.lon) {
            let lat = parse_coordinate(self.lat.as_deref());
            let lon = parse_coordinate(self.lon.as_deref());

            return match (lat, lon) {
                (Some(lat), Some(lon)) => Ok(WeatherQuery::coords(lat, lon)),
                _ => Err(AppError::validation("Invalid coordinates")),
            };
        }

        match self.city {
            Some(city) if !city.trim().is_empty() => Ok(WeatherQuery::city(city.trim())),
            _ => Err(AppError::validation("Missing city or coordinates")),
        }
    }
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Current weather by city or coordinates
///
/// GET /weather?city=London
/// GET /weather?lat=12.97&lon=77.59
#[utoipa::path(
    get,
    path = "/weather",
    params(WeatherParams),
    responses(
        (status = 200, description = "Current weather", body = WeatherData),
        (status = 400, description = "Missing or invalid parameters", body = ErrorResponse),
        (status = 408, description = "Provider timed out", body = ErrorResponse),
        (status = 500, description = "Server misconfigured", body = ErrorResponse),
        (status = 502, description = "Provider error", body = ErrorResponse)
    ),
    tag = "weather"
)]
pub async fn get_weather(
    State(state): State<AppState>,
    params: Result<Query<WeatherParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, Rejection> {
    let Query(params) = params.map_err(|e| {
        tracing::warn!(error = %e, "Rejected weather query string");
        state.boundary.reject(AppError::validation(e.body_text()))
    })?;

    let query = params.into_query().map_err(|e| {
        tracing::warn!(error = %e, "Invalid weather lookup");
        state.boundary.reject(e)
    })?;

    let weather = state
        .weather_service
        .get_weather(&query)
        .await
        .map_err(|e| state.boundary.reject(e))?;

    Ok(Json(weather))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn params(city: Option<&str>, lat: Option<&str>, lon: Option<&str>) -> WeatherParams {
        WeatherParams {
            city: city.map(str::to_string),
            lat: lat.map(str::to_string),
            lon: lon.map(str::to_string),
        }
    }

    #[test]
    fn test_city_only() {
        let query = params(Some("London"), None, None).into_query().expect("valid");
        assert_eq!(query, WeatherQuery::city("London"));
    }

    #[test]
    fn test_coordinates_take_precedence_over_city() {
        let query = params(Some("London"), Some("12.9716"), Some("77.5946"))
            .into_query()
            .expect("valid");
        assert_eq!(query, WeatherQuery::coords(12.9716, 77.5946));
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        for (lat, lon) in [
            ("NaN", "77.5"),
            ("12.9", "inf"),
            ("-infinity", "0"),
            ("north", "77.5"),
            ("12.9", "1e400"),
        ] {
            let err = params(None, Some(lat), Some(lon))
                .into_query()
                .expect_err("should be rejected");
            assert_eq!(err.code(), ErrorCode::ValidationError);
            assert_eq!(err.message(), "Invalid coordinates");
        }
    }

    #[test]
    fn test_invalid_coordinates_not_masked_by_city() {
        let err = params(Some("London"), Some("abc"), Some("1.0"))
            .into_query()
            .expect_err("should be rejected");
        assert_eq!(err.message(), "Invalid coordinates");
    }

    #[test]
    fn test_single_coordinate_falls_back_to_city() {
        let query = params(Some("Paris"), Some("48.85"), None)
            .into_query()
            .expect("valid");
        assert_eq!(query, WeatherQuery::city("Paris"));
    }

    #[test]
    fn test_missing_everything() {
        for p in [
            params(None, None, None),
            params(Some("   "), None, None),
            params(None, Some("1.0"), Some("")),
        ] {
            let err = p.into_query().expect_err("should be rejected");
            assert_eq!(err.code(), ErrorCode::ValidationError);
            assert_eq!(err.message(), "Missing city or coordinates");
        }
    }
}
