//! Error type shared by every handler.
//!
//! Client-facing variants carry the message that is sent back verbatim.
//! [`ApiError::Storage`] logs its detail and only returns the generic
//! "Failed to ..." text, so SQL, paths and upstream errors stay server-side.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

use memorial_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("rate limited: {0}")]
    RateLimited(&'static str),

    #[error("upload rejected: {0}")]
    Upload(String),

    #[error("{message}: {detail}")]
    Storage { message: &'static str, detail: String },
}

impl ApiError {
    /// Wraps an internal failure. `message` is what the client sees.
    pub fn storage(message: &'static str, err: impl std::fmt::Display) -> Self {
        ApiError::Storage {
            message,
            detail: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            ApiError::Validation(errors) => ("Validation failed".to_string(), Some(errors)),
            ApiError::BadRequest(m) | ApiError::Upload(m) => (m, None),
            ApiError::Unauthorized => ("Unauthorized. Please log in.".to_string(), None),
            ApiError::InvalidCredentials => ("Invalid credentials".to_string(), None),
            ApiError::NotFound(m) | ApiError::RateLimited(m) => (m.to_string(), None),
            ApiError::Storage { message, detail } => {
                error!(error = %detail, "{}", message);
                (message.to_string(), None)
            }
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                message,
                errors,
            }),
        )
            .into_response()
    }
}

// -- Extractor rejections --
//
// Handlers wrap their extractors in `WithRejection<_, ApiError>` so a bad
// body or path still answers with the JSON error shape. The serde detail
// only goes to the log.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected JSON body: {}", rejection.body_text());
        ApiError::BadRequest("Invalid request body".into())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!("Rejected query string: {}", rejection.body_text());
        ApiError::BadRequest("Invalid query parameters".into())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!("Rejected path: {}", rejection.body_text());
        ApiError::BadRequest("Invalid path".into())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        debug!("Rejected multipart request: {}", rejection.body_text());
        ApiError::BadRequest("Malformed upload".into())
    }
}

/// Path ids that are not integers cannot name a row, so they get the same
/// 404 as a missing one.
pub fn parse_id(raw: &str, not_found: &'static str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound(not_found))
}
