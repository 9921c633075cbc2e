//! Application error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Security check failed")]
    Authentication,

    #[error("Invalid upload policy: {0}")]
    Policy(String),

    #[error("{0}")]
    FileType(String),

    #[error("{0}")]
    FileSize(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    InternalServerError,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Authentication => {
                (StatusCode::FORBIDDEN, "Security check failed.".to_string())
            }
            AppError::Policy(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::FileType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            AppError::FileSize(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            AppError::IoError(err) => {
                tracing::error!("IO error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::JsonError(err) => {
                tracing::error!("JSON error: {:?}", err);
                (StatusCode::BAD_REQUEST, "Invalid JSON data".to_string())
            }
            AppError::Other(err) => {
                tracing::error!("Unexpected error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        // Error bodies share the widget's response envelope. Only the
        // caller-facing message is included, never paths or source errors.
        let body = Json(json!({
            "success": false,
            "data": { "error": error_message },
        }));

        (status, body).into_response()
    }
}
