//! The API error taxonomy.
//!
//! Every failure surfaced to a caller is one of the [`ApiError`] variants, each
//! mapped to a fixed HTTP status and a JSON `{"error": message}` body. Errors
//! are never retried internally and never swallowed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or missing required input — 400.
    #[error("{0}")]
    Validation(String),

    /// Missing/invalid doctor key or bad login — 401.
    #[error("{0}")]
    Auth(String),

    /// Unknown consultation or vector entry id — 404.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate email or re-review of a settled consultation — 409.
    #[error("{0}")]
    Conflict(String),

    /// Durable-store failure — 500.
    #[error("storage error: {0}")]
    Storage(String),

    /// External text-generation failure — 500.
    #[error("generation error: {0}")]
    Generation(String),
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth("nope".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Generation("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_wraps_rusqlite() {
        let err = ApiError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("storage error:"));
    }
}
