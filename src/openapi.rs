use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::{ErrorBody, ErrorResponse};
use crate::geo::CitySuggestion;
use crate::weather::handlers::HealthResponse;
use crate::weather::WeatherData;

/// OpenAPI documentation for the Skycast mediation API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Skycast API",
        version = "1.0.0",
        description = "Current weather and place search, proxied from OpenWeatherMap with uniform error envelopes.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    paths(
        crate::weather::handlers::get_weather,
        crate::geo::handlers::get_locations,
    ),
    tags(
        (name = "weather", description = "Current weather data"),
        (name = "locations", description = "Place suggestions for search")
    ),
    components(
        schemas(
            ErrorResponse,
            ErrorBody,
            WeatherData,
            CitySuggestion,
            HealthResponse,
        )
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
