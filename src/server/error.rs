//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, ApiError>`; failures become a status code
//! plus a JSON body `{error, code}`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::conversion::{ConversionError, ErrorKind};
use crate::library::PathError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("{0}")]
    BadRequest(String),

    #[error("requested range not satisfiable")]
    RangeNotSatisfiable { size: u64 },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Path(PathError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Path(PathError::Io { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Path(_) => StatusCode::BAD_REQUEST,
            ApiError::Conversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Path(PathError::Invalid { .. }) => "invalid_path",
            ApiError::Path(PathError::OutsideRoot { .. }) => "invalid_path",
            ApiError::Path(PathError::NotFound { .. }) => "not_found",
            ApiError::Path(PathError::NotADirectory { .. }) => "not_a_directory",
            ApiError::Path(PathError::Io { .. }) => "io_error",
            ApiError::Conversion(e) => match e.kind() {
                ErrorKind::ProbeFailure => "probe_error",
                ErrorKind::ProcessStartFailure => "process_start_failed",
                ErrorKind::StreamingFailure => "streaming_failed",
                ErrorKind::ProcessExitFailure => "process_exit_failed",
            },
            ApiError::BadRequest(_) => "bad_request",
            ApiError::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let ApiError::RangeNotSatisfiable { size } = self {
            if let Ok(value) = format!("bytes */{}", size).parse() {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}
