//! Audio codec probing via ffprobe.
//!
//! Only the codec name of the first audio stream is extracted. The output
//! format asks ffprobe for bare values, one per line, so parsing is a trim.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::ToolCommand;
use crate::{Error, Result};

/// Default time allowed for a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Probes the first audio stream of a media file with ffprobe.
#[derive(Debug, Clone)]
pub struct AudioCodecProbe {
    program: PathBuf,
    timeout: Duration,
}

impl Default for AudioCodecProbe {
    fn default() -> Self {
        Self::new(PathBuf::from("ffprobe"))
    }
}

impl AudioCodecProbe {
    /// Create a probe that runs the given ffprobe binary.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Set the maximum time a probe may take before it is killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the ffprobe binary in use.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments selecting the first audio stream's codec name.
    pub fn args(path: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = [
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=codec_name",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .into_iter()
        .map(std::ffi::OsString::from)
        .collect();
        args.push(path.as_os_str().to_owned());
        args
    }

    /// Return the codec name of the first audio stream.
    ///
    /// `Ok(None)` means ffprobe succeeded but reported no audio stream.
    ///
    /// # Errors
    ///
    /// Any failure to run ffprobe, a non-zero exit, or a timeout.
    pub async fn audio_codec(&self, path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }

        let output = ToolCommand::new(self.program.clone())
            .args(Self::args(path))
            .timeout(self.timeout)
            .execute()
            .await?;

        let codec = parse_codec_output(&output.stdout);
        tracing::trace!(path = %path.display(), codec = ?codec, "Probed audio codec");
        Ok(codec)
    }
}

/// Extract the codec name from ffprobe's bare-value output.
pub fn parse_codec_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_ascii_lowercase)
}
