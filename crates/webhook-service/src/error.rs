//! Service-level error taxonomy: configuration failures, adapter wiring
//! failures, and the HTTP-boundary mapping for [`webhook_core::IntakeError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use webhook_core::IntakeError;

/// Errors that can prevent the service from starting or from routing a
/// request once running.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("provider `{provider}` for `{setting}` is not built into this binary")]
    UnsupportedProvider { setting: String, provider: String },

    #[error("failed to initialize adapter: {message}")]
    AdapterInit { message: String },

    #[error("failed to bind {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("HTTP server failed: {message}")]
    ServerFailed { message: String },

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "service_configuration_error",
            Self::UnsupportedProvider { .. } => "service_unsupported_provider",
            Self::AdapterInit { .. } => "service_adapter_init_failed",
            Self::BindFailed { .. } => "service_bind_failed",
            Self::ServerFailed { .. } => "service_server_failed",
            Self::Intake(e) => e.code(),
        }
    }
}

/// Maps an `IntakeError` onto the HTTP status codes spec section 6 assigns
/// to `POST /webhooks`: 401 on signature mismatch, 500 on configuration or
/// storage failure. `400` (missing headers) is produced directly by the
/// extractor, never by this error.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Intake(IntakeError::SignatureInvalid) => StatusCode::UNAUTHORIZED,
            Self::Intake(_)
            | Self::Configuration { .. }
            | Self::AdapterInit { .. }
            | Self::BindFailed { .. }
            | Self::ServerFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnsupportedProvider { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
