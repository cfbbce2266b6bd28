//! # API Errors
//!
//! Maps core errors onto HTTP statuses and the JSON error envelope:
//!
//! ```json
//! {"error": {"code": "not_found", "message": "product 7 not found"}}
//! ```

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use greenfis_core::StoreError;
use serde::Serialize;

/// Everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("missing or invalid API key")]
    Unauthorized,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("{0}")]
    BadRequest(String),

    /// A blocking task panicked or was cancelled.
    #[error("internal error")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => match err {
                StoreError::Validation(_) => StatusCode::BAD_REQUEST,
                StoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::Conflict(_)
                | StoreError::InvalidState(_)
                | StoreError::InsufficientStock { .. }
                | StoreError::NotEmpty => StatusCode::CONFLICT,
                StoreError::Database(_) | StoreError::Codec(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(err) => match err {
                StoreError::Validation(_) => "validation",
                StoreError::InvalidCredentials => "invalid_credentials",
                StoreError::NotFound { .. } => "not_found",
                StoreError::Conflict(_) => "conflict",
                StoreError::InvalidState(_) => "invalid_state",
                StoreError::InsufficientStock { .. } => "insufficient_stock",
                StoreError::NotEmpty => "not_empty",
                StoreError::Database(_) | StoreError::Codec(_) => "storage",
            },
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            // Storage details stay in the log.
            tracing::error!(error = ?self, "request failed");
            "internal server error".to_string()
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
            self.to_string()
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
            },
        };
        let mut response = (status, Json(body)).into_response();
        match self {
            Self::Unauthorized => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer"),
                );
            }
            Self::RateLimited => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
            }
            _ => {}
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (StoreError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (
                StoreError::NotFound {
                    kind: "product",
                    id: 1,
                },
                StatusCode::NOT_FOUND,
            ),
            (StoreError::Conflict("x".into()), StatusCode::CONFLICT),
            (StoreError::InvalidState("x".into()), StatusCode::CONFLICT),
            (
                StoreError::InsufficientStock {
                    product_id: 1,
                    location_id: 1,
                    requested: 2,
                    available: 1,
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }
}
