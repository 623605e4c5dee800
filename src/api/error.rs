//! API error types and conversions

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::types::BasicResponse;
use crate::error::RegistryError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or invalid probe configuration
    InvalidRequest(String),

    /// Resource not found
    NotFound(String),

    /// A probe with the same name is already registered
    Conflict(String),

    /// Initialization or execution failure
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(BasicResponse { message })).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let message = err.to_string();
        if err.is_validation() {
            return ApiError::InvalidRequest(message);
        }
        match err {
            RegistryError::Probe { .. } => ApiError::Internal(message),
            RegistryError::Duplicate(_) => ApiError::Conflict(message),
            RegistryError::NotFound(_) => ApiError::NotFound(message),
        }
    }
}
