//! Direct streaming with HTTP range requests.
//!
//! Serves media files unmodified with support for single byte ranges.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use std::io::SeekFrom;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::classify::extension_of;
use crate::library::PathError;
use crate::server::error::ApiError;
use crate::server::AppContext;

/// Serve a media file directly with range request support.
pub async fn serve_file(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let resolved = ctx.sandbox.resolve(&path)?;

    let metadata = tokio::fs::metadata(&resolved.full)
        .await
        .map_err(|e| PathError::io(&path, e))?;
    if !metadata.is_file() {
        return Err(ApiError::BadRequest(format!("not a file: {}", path)));
    }

    let file_size = metadata.len();
    let content_type = extension_of(&resolved.full)
        .map(|ext| determine_content_type(&ext))
        .unwrap_or("application/octet-stream");

    // Multi-range requests are answered with the whole file.
    let range = match headers.get(header::RANGE).and_then(|h| h.to_str().ok()) {
        Some(value) if value.starts_with("bytes=") && !value.contains(',') => {
            match parse_range_header(value, file_size) {
                Some(range) => Some(range),
                None => return Err(ApiError::RangeNotSatisfiable { size: file_size }),
            }
        }
        _ => None,
    };

    let mut file = File::open(&resolved.full)
        .await
        .map_err(|e| PathError::io(&path, e))?;

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes");

    let response = match range {
        Some((start, end)) => {
            // Partial content response
            let length = end - start + 1;

            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|e| PathError::io(&path, e))?;

            let body = Body::from_stream(ReaderStream::new(file.take(length)));

            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_LENGTH, length.to_string())
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_size),
                )
                .body(body)
        }
        None => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, file_size.to_string())
            .body(Body::from_stream(ReaderStream::new(file))),
    };

    response.map_err(|e| ApiError::Internal(e.to_string()))
}

/// Parse HTTP Range header.
///
/// Supports formats:
/// - bytes=0-499
/// - bytes=500-999
/// - bytes=500-
/// - bytes=-500 (last 500 bytes)
///
/// Returns `None` when the range is malformed or cannot be satisfied.
pub(crate) fn parse_range_header(header: &str, file_size: u64) -> Option<(u64, u64)> {
    let header = header.strip_prefix("bytes=")?;
    if file_size == 0 {
        return None;
    }

    let (start, end) = header.split_once('-')?;
    let start = start.trim();
    let end = end.trim();

    match (start.is_empty(), end.is_empty()) {
        // bytes=-500 (last 500 bytes)
        (true, false) => {
            let suffix_len: u64 = end.parse().ok()?;
            if suffix_len == 0 {
                return None;
            }
            let start = file_size.saturating_sub(suffix_len);
            Some((start, file_size - 1))
        }
        // bytes=500- (from 500 to end)
        (false, true) => {
            let start: u64 = start.parse().ok()?;
            if start >= file_size {
                return None;
            }
            Some((start, file_size - 1))
        }
        // bytes=0-499
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            if start >= file_size || start > end {
                return None;
            }
            Some((start, end.min(file_size - 1)))
        }
        // bytes=- (invalid)
        (true, true) => None,
    }
}

/// Determine content type from file extension.
pub(crate) fn determine_content_type(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "mpg" | "mpeg" => "video/mpeg",
        "3gp" => "video/3gpp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_header_full_range() {
        assert_eq!(parse_range_header("bytes=0-499", 1000), Some((0, 499)));
    }

    #[test]
    fn test_parse_range_header_open_end() {
        assert_eq!(parse_range_header("bytes=500-", 1000), Some((500, 999)));
    }

    #[test]
    fn test_parse_range_header_suffix() {
        assert_eq!(parse_range_header("bytes=-200", 1000), Some((800, 999)));
        assert_eq!(parse_range_header("bytes=-5000", 1000), Some((0, 999)));
        assert_eq!(parse_range_header("bytes=-0", 1000), None);
    }

    #[test]
    fn test_parse_range_header_clamped() {
        assert_eq!(parse_range_header("bytes=0-2000", 1000), Some((0, 999)));
    }

    #[test]
    fn test_parse_range_header_unsatisfiable() {
        assert_eq!(parse_range_header("bytes=1500-", 1000), None);
        assert_eq!(parse_range_header("bytes=600-500", 1000), None);
        assert_eq!(parse_range_header("bytes=0-10", 0), None);
        assert_eq!(parse_range_header("bytes=-10", 0), None);
    }

    #[test]
    fn test_parse_range_header_invalid_format() {
        assert_eq!(parse_range_header("bytes=-", 1000), None);
        assert_eq!(parse_range_header("bytes=abc-def", 1000), None);
        assert_eq!(parse_range_header("items=0-1", 1000), None);
    }

    #[test]
    fn test_determine_content_type() {
        assert_eq!(determine_content_type("mp4"), "video/mp4");
        assert_eq!(determine_content_type("MKV"), "video/x-matroska");
        assert_eq!(determine_content_type("webm"), "video/webm");
        assert_eq!(determine_content_type("ogg"), "video/ogg");
        assert_eq!(determine_content_type("unknown"), "application/octet-stream");
    }
}
