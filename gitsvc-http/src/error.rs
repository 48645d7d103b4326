//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gitsvc_core::error::ParseFormat;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Request-scoped failures
#[derive(Debug)]
pub enum AppError {
    /// The requested file does not exist (404, empty body)
    NotFound,
    /// The file has a recognised extension but does not parse
    Parse(ParseFormat),
    /// Walking the working copy failed
    Tree(anyhow::Error),
    /// Anything else unexpected
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND.into_response(),
            AppError::Parse(format) => error_response(format!("Failed to parse {}", format)),
            AppError::Tree(err) => {
                error!(error = %err, "failed to build file tree");
                error_response("Failed to build file tree".to_string())
            }
            AppError::Internal(err) => {
                error!(error = %err, "internal server error");
                error_response("Internal server error".to_string())
            }
        }
    }
}

fn error_response(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody { error: message }),
    )
        .into_response()
}

impl From<gitsvc_core::Error> for AppError {
    fn from(err: gitsvc_core::Error) -> Self {
        match err {
            gitsvc_core::Error::NotFound(_) => AppError::NotFound,
            gitsvc_core::Error::Parse { format, .. } => AppError::Parse(format),
            other => AppError::Internal(other.into()),
        }
    }
}
