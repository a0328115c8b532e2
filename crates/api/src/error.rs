//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (bad path ID, unparseable body).
    BadRequest(String),
    /// Domain or store error.
    Domain(DomainError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

const INTERNAL_MESSAGE: &str = "An internal server error occurred.";

impl ApiError {
    /// Returns the HTTP status, error code and client-facing message.
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            ApiError::Domain(err) => match err.kind() {
                Some(ErrorKind::Validation) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
                }
                Some(ErrorKind::NotFound) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                Some(ErrorKind::BusinessRule) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "BUSINESS_RULE_VIOLATION",
                    err.to_string(),
                ),
                None => {
                    tracing::error!(error = %err, "domain operation failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        INTERNAL_MESSAGE.to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
