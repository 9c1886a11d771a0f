use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::models::CitySuggestion;
use crate::error::{AppError, ErrorResponse, Rejection};
use crate::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocationParams {
    /// Free-text place name
    pub q: Option<String>,
}

/// Place suggestions for a search text
///
/// GET /locations?q=Lon
#[utoipa::path(
    get,
    path = "/locations",
    params(LocationParams),
    responses(
        (status = 200, description = "Up to five matches in provider order", body = Vec<CitySuggestion>),
        (status = 400, description = "Missing query or server misconfigured", body = ErrorResponse),
        (status = 408, description = "Provider timed out", body = ErrorResponse),
        (status = 502, description = "Provider error", body = ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn get_locations(
    State(state): State<AppState>,
    params: Result<Query<LocationParams>, QueryRejection>,
) -> Result<Json<Vec<CitySuggestion>>, Rejection> {
    let Query(params) = params.map_err(|e| {
        tracing::warn!(error = %e, "Rejected location query string");
        state.boundary.reject(AppError::validation(e.body_text()))
    })?;

    let locations = state
        .geo_service
        .get_locations(params.q.as_deref().unwrap_or_default())
        .await
        .map_err(|e| state.boundary.reject(e))?;

    Ok(Json(locations))
}
