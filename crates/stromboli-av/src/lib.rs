//! # stromboli-av
//!
//! External media tool plumbing for stromboli.
//!
//! This crate provides:
//! - Tool discovery for ffmpeg and ffprobe
//! - First-audio-stream codec probing via ffprobe
//! - The ffmpeg argument set for live, browser-playable transcodes
//!
//! ## Example
//!
//! ```no_run
//! use stromboli_av::AudioCodecProbe;
//!
//! # async fn example() -> stromboli_av::Result<()> {
//! let probe = AudioCodecProbe::default();
//! let codec = probe.audio_codec("/path/to/video.mp4".as_ref()).await?;
//! println!("Audio codec: {:?}", codec);
//! # Ok(())
//! # }
//! ```

mod command;
mod error;
pub mod probe;
pub mod tools;
pub mod transcode;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use probe::AudioCodecProbe;
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, resolve_tool, ToolInfo};
pub use transcode::TranscodeSettings;
