use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::Environment;

/// Message shown to callers whenever the real cause must not leak
pub const SERVER_CONFIGURATION_ERROR: &str = "Server configuration error";

const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Machine-readable error codes understood by every layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    ExternalApiError,
    Timeout,
    InternalError,
    NetworkError,
    RequestFailed,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::ExternalApiError => "EXTERNAL_API_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::RequestFailed => "REQUEST_FAILED",
        }
    }

    /// Parse a wire code; unknown codes yield `None`
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "VALIDATION_ERROR" => Some(Self::ValidationError),
            "NOT_FOUND" => Some(Self::NotFound),
            "EXTERNAL_API_ERROR" => Some(Self::ExternalApiError),
            "TIMEOUT" => Some(Self::Timeout),
            "INTERNAL_ERROR" => Some(Self::InternalError),
            "NETWORK_ERROR" => Some(Self::NetworkError),
            "REQUEST_FAILED" => Some(Self::RequestFailed),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure, raised where the fault is detected and converted to
/// a wire response exactly once by [`ErrorBoundary`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct AppError {
    message: String,
    status: StatusCode,
    code: ErrorCode,
    operational: bool,
    details: Option<serde_json::Value>,
}

impl AppError {
    pub fn new(message: impl Into<String>, status: StatusCode, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            status,
            code,
            operational: true,
            details: None,
        }
    }

    /// Caller input missing or malformed (400)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST, ErrorCode::ValidationError)
    }

    /// Requested resource absent (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND, ErrorCode::NotFound)
    }

    /// Upstream provider failure (502 unless overridden with [`AppError::with_status`])
    pub fn external_api(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_GATEWAY, ErrorCode::ExternalApiError)
    }

    /// Upstream call exceeded its deadline (408)
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::REQUEST_TIMEOUT, ErrorCode::Timeout)
    }

    /// Missing configuration and other server-side faults (500)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            message,
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
        )
    }

    /// Transport fault below HTTP: DNS, refused or reset connections (500)
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(
            message,
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::NetworkError,
        )
    }

    /// A fault nobody anticipated. Still shaped as an internal error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self {
            operational: false,
            ..Self::internal(message)
        }
    }

    /// Override the status; only 4xx/5xx statuses are accepted
    pub fn with_status(mut self, status: StatusCode) -> Self {
        if status.is_client_error() || status.is_server_error() {
            self.status = status;
        }
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }
}

/// Standard error envelope for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// The single conversion point from faults to wire responses.
///
/// Details and unexpected-fault messages are only exposed in development.
#[derive(Debug, Clone, Copy)]
pub struct ErrorBoundary {
    environment: Environment,
}

impl ErrorBoundary {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Build the envelope for a classified error
    pub fn envelope(&self, err: &AppError) -> ErrorResponse {
        let details = if self.environment.is_development() {
            err.details().cloned()
        } else {
            None
        };

        ErrorResponse {
            success: false,
            error: ErrorBody {
                message: err.message().to_string(),
                code: err.code().as_str().to_string(),
                status: err.status().as_u16(),
                details,
            },
        }
    }

    pub fn respond(&self, err: &AppError) -> Response {
        tracing::debug!(
            error = %err,
            status = %err.status(),
            code = %err.code(),
            operational = err.is_operational(),
            "API error"
        );

        (err.status(), Json(self.envelope(err))).into_response()
    }

    /// Shape a fault that never became an [`AppError`]
    pub fn unexpected(&self, fault: &dyn fmt::Display) -> Response {
        tracing::error!(error = %fault, "Unexpected fault reached the error boundary");

        let message = if self.environment.is_production() {
            UNEXPECTED_ERROR_MESSAGE.to_string()
        } else {
            fault.to_string()
        };

        self.respond(&AppError::unexpected(message))
    }

    /// Pair an error with this boundary so handlers can return it with `?`
    pub fn reject(&self, error: AppError) -> Rejection {
        Rejection {
            boundary: *self,
            error,
        }
    }
}

/// Handler error type; converted through its [`ErrorBoundary`]
#[derive(Debug)]
pub struct Rejection {
    boundary: ErrorBoundary,
    error: AppError,
}

impl Rejection {
    pub fn error(&self) -> &AppError {
        &self.error
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        self.boundary.respond(&self.error)
    }
}
