//! Stromboli - browse a media directory and play it in the browser
//!
//! Native files are served as-is with range support; everything else is
//! converted on the fly by a single supervised ffmpeg process.
//!
//! This library crate exposes the core functionality for integration testing.

pub mod classify;
pub mod config;
pub mod conversion;
pub mod library;
pub mod probe;
pub mod server;
pub mod streaming;
