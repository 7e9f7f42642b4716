//! Standardized API error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::Error;

/// Machine-readable error code for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    TenantRequired,
    BadRequest,
    NotFound,
    Precondition,
    NoProfilesAvailable,
    Conflict,
    Unavailable,
    InternalError,
}

/// Standardized error response for all API endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub success: bool,
    /// Machine-readable error code
    pub code: ApiErrorCode,
    /// Human-readable error message
    pub error: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            error: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    fn status_code(&self) -> StatusCode {
        match self.code {
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::TenantRequired
            | ApiErrorCode::BadRequest
            | ApiErrorCode::Precondition
            | ApiErrorCode::NoProfilesAvailable => StatusCode::BAD_REQUEST,
            ApiErrorCode::Conflict => StatusCode::CONFLICT,
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        match error {
            Error::TenantRequired(message) => Self::new(ApiErrorCode::TenantRequired, message),
            Error::Validation(message) => Self::new(ApiErrorCode::BadRequest, message),
            Error::NotFound { .. } => Self::new(ApiErrorCode::NotFound, error.to_string()),
            Error::Precondition(message) => Self::new(ApiErrorCode::Precondition, message),
            Error::NoProfilesAvailable => {
                Self::new(ApiErrorCode::NoProfilesAvailable, error.to_string())
            }
            Error::Conflict(message) => Self::new(ApiErrorCode::Conflict, message),
            Error::Transient(ref cause) => {
                tracing::warn!(error = %cause, "transient failure surfaced to API");
                Self::new(ApiErrorCode::Unavailable, error.to_string())
            }
            Error::Database(ref cause) => {
                tracing::error!(error = %cause, "database error");
                Self::new(ApiErrorCode::InternalError, "internal error")
            }
            Error::Other(ref cause) => {
                tracing::error!(error = %cause, "internal error");
                Self::new(ApiErrorCode::InternalError, "internal error")
            }
        }
    }
}
