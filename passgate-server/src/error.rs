//! API error handling module
//!
//! Provides a unified error type for all API endpoints. Every authentication
//! failure maps to the same `406 Not Acceptable` body so responses cannot be
//! used to tell a bad signature from an unknown user or an expired session.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use passgate_core::PassgateError;
use thiserror::Error;

/// Client-facing message for every rejected assertion
const NOT_ACCEPTABLE_MESSAGE: &str = "Not Acceptable";

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflict - the resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not acceptable - assertion rejected; detail stays server-side
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),
}

impl ApiError {
    /// Create a not acceptable error
    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::NotAcceptable(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Conflict(_) => "CONFLICT",
            Self::NotAcceptable(_) => "NOT_ACCEPTABLE",
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::NotAcceptable(_) => NOT_ACCEPTABLE_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Conflict(_) => "conflict",
            Self::NotAcceptable(_) => "not_acceptable",
        }
    }
}

impl From<PassgateError> for ApiError {
    fn from(err: PassgateError) -> Self {
        match err {
            PassgateError::InvalidInput(message) => Self::BadRequest(message),
            // Unknown identities on /session are reported the same way as bad input.
            PassgateError::NotFound(message) => Self::BadRequest(message),
            PassgateError::Conflict(message) => Self::Conflict(message),
            PassgateError::Rejected => Self::NotAcceptable("assertion rejected".into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) | Self::Conflict(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Client error"
                );
            }
            Self::NotAcceptable(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Authentication rejected"
                );
            }
        }

        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let conflict: ApiError = PassgateError::Conflict("alice".into()).into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let missing: ApiError = PassgateError::NotFound("alice".into()).into();
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);

        let rejected: ApiError = PassgateError::Rejected.into();
        assert_eq!(rejected.status_code(), StatusCode::NOT_ACCEPTABLE);
    }

    #[test]
    fn test_not_acceptable_hides_detail() {
        let a = ApiError::not_acceptable("rpIdHash mismatch");
        let b = ApiError::not_acceptable("unknown identity");
        assert_eq!(a.client_message(), b.client_message());
        assert_eq!(a.error_code(), b.error_code());
    }
}
