//! HTTP error type

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bluehour_api::ErrorBody;
use bluehour_core::CoreError;
use thiserror::Error;
use tracing::error;

const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again.";

/// Error returned by handlers; rendered as `{"error": ..., "details"?: ...}`
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation { message, details } => AppError::BadRequest {
                message,
                details: serde_json::to_value(details).ok(),
            },
            CoreError::EmailTaken => AppError::Conflict(e.to_string()),
            CoreError::InvalidCredentials => AppError::Unauthorized(e.to_string()),
            CoreError::EntryNotFound => AppError::NotFound(e.to_string()),
            CoreError::Store(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest {
            message: "Invalid request body.".into(),
            details: Some(serde_json::Value::String(rejection.body_text())),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest {
            message: "Invalid query parameters.".into(),
            details: Some(serde_json::Value::String(rejection.body_text())),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::BadRequest { message, details } => ErrorBody {
                error: message,
                details,
            },
            AppError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                ErrorBody {
                    error: INTERNAL_MESSAGE.into(),
                    details: None,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluehour_store::StoreError;

    #[test]
    fn core_errors_map_to_status() {
        let cases = [
            (CoreError::EmailTaken, StatusCode::CONFLICT),
            (CoreError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (CoreError::EntryNotFound, StatusCode::NOT_FOUND),
            (
                CoreError::Store(StoreError::Database("disk full".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (core, status) in cases {
            assert_eq!(AppError::from(core).status(), status);
        }
    }

    #[test]
    fn validation_keeps_message_and_details() {
        let err = bluehour_core::validate_patch(&Default::default()).unwrap_err();
        match AppError::from(err) {
            AppError::BadRequest { message, details } => {
                assert_eq!(message, "Nothing to update.");
                assert!(details.unwrap().get("entry").is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn internal_errors_hide_detail() {
        let response = AppError::Internal("secret path".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
