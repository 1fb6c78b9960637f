//! Arguments for live browser-compatible transcoding with ffmpeg.
//!
//! The output is H.264 + AAC stereo in fragmented MP4 written to stdout, so a
//! browser can begin playback before the encode finishes.

use std::ffi::OsString;
use std::path::Path;

/// Encoder settings for live transcodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeSettings {
    /// Video encoder (default: libx264).
    pub video_codec: String,
    /// Encoder preset (default: ultrafast).
    pub preset: String,
    /// Encoder tune (default: zerolatency). Empty disables `-tune`.
    pub tune: String,
    /// Constant rate factor (default: 23).
    pub crf: u32,
    /// Video bitrate cap (default: 3M).
    pub max_rate: String,
    /// Rate control buffer size (default: 6M).
    pub buf_size: String,
    /// Output pixel format (default: yuv420p).
    pub pixel_format: String,
    /// Audio encoder (default: aac).
    pub audio_codec: String,
    /// Audio bitrate (default: 128k).
    pub audio_bitrate: String,
    /// Downmix channel count (default: 2).
    pub audio_channels: u32,
    /// Read input at its native frame rate (`-re`).
    pub realtime: bool,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            tune: "zerolatency".to_string(),
            crf: 23,
            max_rate: "3M".to_string(),
            buf_size: "6M".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            audio_channels: 2,
            realtime: true,
        }
    }
}

/// Fragmented MP4 flags: emit moof/mdat pairs at keyframes behind an empty
/// moov so nothing has to be rewritten at the end.
pub const STREAMING_MOVFLAGS: &str = "frag_keyframe+empty_moov+default_base_moof";

impl TranscodeSettings {
    /// Build the full ffmpeg argument list for `input`, writing to stdout.
    pub fn ffmpeg_args(&self, input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-nostdin".into()];
        if self.realtime {
            args.push("-re".into());
        }
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());

        // First video and first audio only; the audio map is optional so
        // silent sources still convert.
        let mut rest = vec!["-map", "0:v:0", "-map", "0:a:0?"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        rest.extend(["-c:v".into(), self.video_codec.clone()]);
        rest.extend(["-preset".into(), self.preset.clone()]);
        if !self.tune.is_empty() {
            rest.extend(["-tune".into(), self.tune.clone()]);
        }
        rest.extend(["-crf".into(), self.crf.to_string()]);
        rest.extend(["-maxrate".into(), self.max_rate.clone()]);
        rest.extend(["-bufsize".into(), self.buf_size.clone()]);
        rest.extend(["-pix_fmt".into(), self.pixel_format.clone()]);

        rest.extend(["-c:a".into(), self.audio_codec.clone()]);
        rest.extend(["-b:a".into(), self.audio_bitrate.clone()]);
        rest.extend(["-ac".into(), self.audio_channels.to_string()]);

        rest.extend(["-movflags".into(), STREAMING_MOVFLAGS.into()]);
        rest.extend(["-f".into(), "mp4".into()]);
        rest.extend(["-loglevel".into(), "warning".into()]);
        rest.push("pipe:1".into());

        args.extend(rest.into_iter().map(OsString::from));
        args
    }
}
