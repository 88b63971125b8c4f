use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{models::ErrorBody, repository::RepositoryError};

/// Realm advertised in `WWW-Authenticate` on 401 responses.
pub const BASIC_REALM: &str = "Basic realm=\"authors\"";

/// ApiError
///
/// The single error type returned by handlers and extractors. Each variant maps
/// to one HTTP status; the response body is always `{"status": .., "message": ..}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials. HTTP 401.
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated but lacking the admin role. HTTP 403.
    #[error("{0}")]
    Forbidden(String),

    /// Lookup or mutation target is absent. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Input failed validation. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Unique constraint hit in the store. HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Any other store failure. HTTP 500.
    #[error(transparent)]
    Store(RepositoryError),

    /// Unexpected failure outside the store (e.g. hashing). HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => ApiError::Conflict(message),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side failures are logged in full; the client only sees a generic message.
        let message = match &self {
            ApiError::Store(_) | ApiError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorBody {
            status: status.as_u16(),
            message,
        });

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_REALM),
            );
        }
        response
    }
}
