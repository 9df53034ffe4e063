//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database: {0}")]
    Db(#[from] mongodb::error::Error),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// True when the underlying MongoDB error is a unique-index violation (code 11000).
    pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
        match *err.kind {
            mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
                ref write_err,
            )) => write_err.code == 11000,
            _ => false,
        }
    }

    /// Map a write error to `Conflict` with the given message when it is a
    /// duplicate-key violation, passing everything else through as `Db`.
    pub fn conflict_on_duplicate(err: mongodb::error::Error, message: &str) -> AppError {
        if Self::is_duplicate_key(&err) {
            AppError::Conflict(message.to_string())
        } else {
            AppError::Db(err)
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            AppError::Conflict(m) => (StatusCode::CONFLICT, m),
            AppError::Db(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(m) => {
                tracing::error!(message = %m, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}
