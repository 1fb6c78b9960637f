//! Construction of the external conversion process.

use std::path::{Path, PathBuf};

use stromboli_av::TranscodeSettings;
use tokio::process::Command;

/// Builds the command that converts one source file to a browser-playable
/// byte stream on stdout.
///
/// The supervisor owns stdio wiring and process lifetime; implementations
/// only choose the program and its arguments.
pub trait Transcoder: Send + Sync {
    /// Program name for logs and errors.
    fn name(&self) -> &str;

    /// Command converting `source`.
    fn command(&self, source: &Path) -> Command;
}

/// Live fragmented-MP4 transcoding through ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    settings: TranscodeSettings,
}

impl FfmpegTranscoder {
    pub fn new(program: PathBuf, settings: TranscodeSettings) -> Self {
        Self { program, settings }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn command(&self, source: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.settings.ffmpeg_args(source));
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_targets_configured_program() {
        let transcoder = FfmpegTranscoder::new(
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg"),
            TranscodeSettings::default(),
        );
        let cmd = transcoder.command(Path::new("/m/movie.mkv"));
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "/opt/ffmpeg/bin/ffmpeg");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert!(args.iter().any(|a| *a == "/m/movie.mkv"));
        assert_eq!(args.last().copied(), Some(std::ffi::OsStr::new("pipe:1")));
    }
}
