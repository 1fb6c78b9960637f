//! Live conversion responses.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};

use crate::conversion::pipeline;
use crate::library::PathError;
use crate::server::error::ApiError;
use crate::server::AppContext;

/// Stream a file through the encoder.
///
/// The response has no length and no range support. Dropping it (client
/// disconnect) stops the encoder.
pub async fn stream_converted(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let resolved = ctx.sandbox.resolve(&path)?;

    let metadata = tokio::fs::metadata(&resolved.full)
        .await
        .map_err(|e| PathError::io(&path, e))?;
    if !metadata.is_file() {
        return Err(ApiError::BadRequest(format!("not a file: {}", path)));
    }

    tracing::info!(source = %resolved.relative.display(), "Conversion stream requested");

    let stream = pipeline::start(ctx.supervisor.clone(), resolved.full)
        .ready()
        .await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
