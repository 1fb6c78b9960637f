//! Media streaming module.
//!
//! # Routes
//!
//! - `GET /video/{path}` - Direct file streaming with range support
//! - `GET /stream/{path}` - Live conversion to fragmented MP4

mod direct;
mod transcode;

pub use direct::serve_file;
pub use transcode::stream_converted;

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create the streaming router.
pub fn streaming_router() -> Router<AppContext> {
    Router::new()
        .route("/video/*path", get(serve_file))
        .route("/stream/*path", get(stream_converted))
}
