use std::any::Any;

use axum::{error_handling::HandleErrorLayer, response::Response, routing::get, BoxError, Router};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    trace::TraceLayer,
};

use crate::error::{AppError, ErrorBoundary};
use crate::geo::handlers as geo_handlers;
use crate::openapi::swagger_ui;
use crate::weather::handlers as weather_handlers;
use crate::AppState;

/// Shape middleware failures (request deadline, overload) as error envelopes
fn handle_middleware_error(boundary: ErrorBoundary, err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::error!("Request exceeded the server deadline");
        boundary.respond(&AppError::timeout("Request timed out"))
    } else {
        boundary.unexpected(&err)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Build the mediation API routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/weather", get(weather_handlers::get_weather))
        .route("/locations", get(geo_handlers::get_locations))
}

/// Build the complete application router
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        // Health check at root level
        .route("/", get(weather_handlers::health))
        .route("/health", get(weather_handlers::health))
        .merge(api_routes());

    with_middleware(routes, state)
        // Swagger UI for API documentation
        .merge(swagger_ui())
}

/// Wrap routes in the deadline, panic, compression, CORS and trace layers
fn with_middleware(routes: Router<AppState>, state: AppState) -> Router {
    let boundary = state.boundary;
    let request_timeout = state.config.request_timeout();

    routes
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    handle_middleware_error(boundary, err)
                }))
                .timeout(request_timeout),
        )
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| {
                boundary.unexpected(&panic_message(panic.as_ref()))
            },
        ))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Environment};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base: &str, api_key: Option<&str>) -> AppConfig {
        let mut config: AppConfig = config::Config::builder()
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("default config");
        config.openweathermap_api_key = api_key.map(str::to_string);
        config.weather_base_url = format!("{base}/data/2.5/weather");
        config.geo_base_url = format!("{base}/geo/1.0/direct");
        config.environment = Environment::Production;
        config
    }

    fn app(config: AppConfig) -> Router {
        let state = AppState::from_config(config, reqwest::Client::new()).expect("state");
        build_router(state)
    }

    async fn send_get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn weather_body() -> serde_json::Value {
        serde_json::json!({
            "name": "Bengaluru",
            "coord": { "lon": 77.5946, "lat": 12.9716 },
            "main": { "temp": 25.0, "feels_like": 26.0, "temp_min": 24.0, "temp_max": 27.0, "humidity": 70 },
            "weather": [{ "id": 801, "main": "Clouds", "description": "few clouds", "icon": "02d" }],
            "wind": { "speed": 3.1, "deg": 250 },
            "sys": { "country": "IN" }
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = send_get(app(test_config("http://127.0.0.1:1", None)), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_weather_missing_params() {
        let (status, json) = send_get(app(test_config("http://127.0.0.1:1", Some("k"))), "/weather").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "Missing city or coordinates");
        assert_eq!(json["error"]["status"], 400);
    }

    #[tokio::test]
    async fn test_weather_non_finite_coordinates() {
        for uri in [
            "/weather?lat=NaN&lon=77.5",
            "/weather?lat=12.9&lon=inf",
            "/weather?lat=abc&lon=1&city=London",
        ] {
            let (status, json) = send_get(app(test_config("http://127.0.0.1:1", Some("k"))), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
            assert_eq!(json["error"]["message"], "Invalid coordinates");
        }
    }

    #[tokio::test]
    async fn test_weather_coordinates_win_over_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "12.9716"))
            .and(query_param("lon", "77.5946"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body()))
            .expect(1)
            .mount(&server)
            .await;

        let (status, json) = send_get(
            app(test_config(&server.uri(), Some("k"))),
            "/weather?city=London&lat=12.9716&lon=77.5946",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "Bengaluru");
        assert_eq!(json["wind"]["deg"], 250);

        let requests = server.received_requests().await.expect("recorded");
        assert!(requests
            .iter()
            .all(|r| !r.url.query_pairs().any(|(k, _)| k == "q")));
    }

    #[tokio::test]
    async fn test_weather_provider_error_maps_to_external_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "cod": 500, "message": "Internal error" })),
            )
            .mount(&server)
            .await;

        let app = app(test_config(&server.uri(), Some("k")));
        let (status, json) = send_get(app.clone(), "/weather?city=London").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "EXTERNAL_API_ERROR");
        // Details never leave the server outside development
        assert!(json["error"].get("details").is_none());

        // The server keeps serving
        let (status, _) = send_get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_weather_without_api_key_is_masked() {
        let (status, json) = send_get(app(test_config("http://127.0.0.1:1", None)), "/weather?city=London").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], "Server configuration error");
    }

    #[tokio::test]
    async fn test_weather_upstream_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(weather_body())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri(), Some("k"));
        config.upstream_timeout_secs = 1;

        let (status, json) = send_get(app(config), "/weather?city=London").await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(json["error"]["code"], "TIMEOUT");
        assert_eq!(json["error"]["status"], 408);
    }

    #[tokio::test]
    async fn test_locations_requires_query() {
        for uri in ["/locations", "/locations?q=", "/locations?q=%20%20"] {
            let (status, json) = send_get(app(test_config("http://127.0.0.1:1", Some("k"))), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_locations_without_api_key_is_masked() {
        let (status, json) = send_get(app(test_config("http://127.0.0.1:1", None)), "/locations?q=London").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "Server configuration error");
    }

    #[tokio::test]
    async fn test_locations_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Lon"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "name": "London", "state": "England", "country": "GB", "lat": 51.5073, "lon": -0.1276 },
                { "name": "London", "state": "Ontario", "country": "CA", "lat": 42.9834, "lon": -81.233 }
            ])))
            .mount(&server)
            .await;

        let (status, json) = send_get(app(test_config(&server.uri(), Some("k"))), "/locations?q=Lon").await;

        assert_eq!(status, StatusCode::OK);
        let entries = json.as_array().expect("array");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["state"], "England");
        assert_eq!(entries[1]["state"], "Ontario");
    }

    #[tokio::test]
    async fn test_weather_body_relayed_verbatim() {
        let body = serde_json::json!({
            "id": 1277333,
            "cod": 200,
            "base": "stations",
            "name": "Bengaluru",
            "coord": { "lon": 77.5946, "lat": 12.9716 },
            "main": { "temp": 25.0, "feels_like": 26.0, "temp_max": 27.0 },
            "weather": [{ "id": 801, "main": "Clouds", "description": "few clouds", "icon": "02d" }],
            "wind": { "deg": 250, "gust": 5.2 }
        });

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(&server)
            .await;

        let (status, json) = send_get(
            app(test_config(&server.uri(), Some("k"))),
            "/weather?city=Bengaluru",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, body);
    }

    #[tokio::test]
    async fn test_panic_is_shaped_as_internal_error() {
        async fn explode() -> &'static str {
            panic!("handler blew up")
        }

        let state = AppState::from_config(
            test_config("http://127.0.0.1:1", None),
            reqwest::Client::new(),
        )
        .expect("state");
        let router = with_middleware(Router::new().route("/boom", get(explode)), state);

        let (status, json) = send_get(router, "/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], "An unexpected error occurred");
    }
}
