//! API error types and response formatting.

use arbor_core::Error as CoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Wrapper turning the domain error taxonomy into HTTP responses.
#[derive(Debug)]
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self.0 {
            CoreError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, "not_found", Some(self.0.to_string()))
            }
            CoreError::Conflict { .. } => {
                (StatusCode::CONFLICT, "conflict", Some(self.0.to_string()))
            }
            CoreError::InvalidArgument { .. } => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                Some(self.0.to_string()),
            ),
            CoreError::Internal { .. } => {
                tracing::error!(error = %self.0, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    Some("An internal error occurred".to_string()),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_for(err: CoreError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(CoreError::not_found("post 1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(CoreError::conflict("parent in another thread")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(CoreError::invalid_argument("bad sort")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(CoreError::internal("storage failure")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_body_hides_the_cause() {
        let response = ApiError::from(CoreError::internal("pool exhausted")).into_response();
        // The coarse reason stays in the logs; the body is generic.
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
