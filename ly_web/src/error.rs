//! ABOUTME: JSON error responses for the REST API
//! ABOUTME: Maps core errors and validation failures to status codes

use crate::models::ErrorResponse;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::{Map, Value};
use std::fmt;
use tracing::error;
use validator::ValidationErrors;

/// API error rendered as `{"error", "message", "details"?}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(error, message),
        }
    }

    /// Validation failure with the messages grouped per field
    pub fn validation(errors: ValidationErrors) -> Self {
        let mut details = Map::new();
        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<Value> = field_errors
                .iter()
                .map(|e| {
                    let text = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for field '{}'", field));
                    Value::String(text)
                })
                .collect();
            details.insert(field.to_string(), Value::Array(messages));
        }

        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse::with_details(
                "validation_failed",
                "Validation failed",
                Value::Object(details),
            ),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn invalid_json() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_json", "JSON data required")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            message,
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.body.error, self.body.message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(&self.body)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}

impl From<ly_core::Error> for ApiError {
    fn from(err: ly_core::Error) -> Self {
        match err {
            ly_core::Error::Validation(msg) => Self::bad_request(msg),
            ly_core::Error::Unauthorized(msg) => Self::unauthorized(msg),
            ly_core::Error::NotFound(msg) => Self::not_found(msg),
            ly_core::Error::Conflict(msg) => Self::conflict(msg),
            other => {
                error!("Request failed: {}", other);
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
