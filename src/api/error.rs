//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::QueryError;

/// Challenge sent with 401 responses
pub const AUTH_CHALLENGE: &str = "Basic realm=\"rrdgate\"";

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong basic auth credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Query parsing or execution error
    #[error("{0}")]
    Query(#[from] QueryError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::storage::StorageError> for ApiError {
    fn from(err: crate::storage::StorageError) -> Self {
        ApiError::Query(QueryError::Storage(err))
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// HTTP status and machine readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Query(e) => match e {
                QueryError::InvalidTimeFormat(_) => (StatusCode::BAD_REQUEST, "INVALID_TIME_FORMAT"),
                QueryError::InvalidDurationFormat(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_DURATION_FORMAT")
                }
                QueryError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "INVALID_QUERY"),
                QueryError::InvalidQueryType(_) => (StatusCode::BAD_REQUEST, "INVALID_QUERY_TYPE"),
                QueryError::InvalidConsolidation(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_CONSOLIDATION")
                }
                QueryError::MetricNotFound(_) => (StatusCode::NOT_FOUND, "METRIC_NOT_FOUND"),
                QueryError::DatasourceNotFound { .. } => {
                    (StatusCode::NOT_FOUND, "DATASOURCE_NOT_FOUND")
                }
                QueryError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(AUTH_CHALLENGE),
            );
        }

        response
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
